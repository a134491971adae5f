//! 参数校验钩子（ArgsValidator）
//!
//! 可插拔策略：在任何处理器运行之前校验本次发射的参数，失败则整次发射中止。
//! 事件默认不挂载校验器。
//!
use crate::error::ValidationError;

pub trait ArgsValidator<A>: Send + Sync {
    fn validate(&self, args: &A) -> Result<(), ValidationError>;
}

impl<A, F> ArgsValidator<A> for F
where
    F: Fn(&A) -> Result<(), ValidationError> + Send + Sync,
{
    fn validate(&self, args: &A) -> Result<(), ValidationError> {
        self(args)
    }
}
