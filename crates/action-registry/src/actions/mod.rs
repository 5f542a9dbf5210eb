pub mod click;
pub mod done;
pub mod dropdown;
pub mod extract;
pub mod files;
pub mod input;
pub mod navigate;
pub mod scroll;
pub mod sheets;
pub mod tabs;
