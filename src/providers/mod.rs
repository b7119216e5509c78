pub mod indogold;
pub mod jisdor;
pub mod util;
