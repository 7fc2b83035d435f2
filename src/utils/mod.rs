//! 通用工具：日志与输入校验

pub mod logger;
pub mod validator;
