use log::debug;
use std::ops::Deref;

use super::{GeoToolbox, ToolboxError};

/// Checked-out toolbox. Checks the toolbox back in when dropped, on every
/// exit path.
pub struct ToolboxSession<'a, T: GeoToolbox + ?Sized> {
    toolbox: &'a mut T,
}

impl<'a, T: GeoToolbox + ?Sized> ToolboxSession<'a, T> {
    pub fn check_out(toolbox: &'a mut T) -> Result<Self, ToolboxError> {
        toolbox.check_out()?;
        debug!("Toolbox session checked out");
        Ok(Self { toolbox })
    }
}

impl<T: GeoToolbox + ?Sized> Deref for ToolboxSession<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.toolbox
    }
}

impl<T: GeoToolbox + ?Sized> Drop for ToolboxSession<'_, T> {
    fn drop(&mut self) {
        self.toolbox.check_in();
        debug!("Toolbox session checked in");
    }
}
