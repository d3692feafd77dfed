pub mod destroy;
pub mod outputs;
pub mod preview;
pub mod up;
pub mod validate;
