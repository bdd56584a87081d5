pub mod prelude;

pub mod logs;
