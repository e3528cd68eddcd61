pub mod runtime;
pub mod bridge;
pub mod sandbox;

pub use runtime::LuaScriptHost;
