//! `SetTimer`: record a named timestamp.
//!
//! The engine queues `SetTimer` markers around every document so the runner
//! can measure how long each config segment took. Run at build time it simply
//! stamps the build-info handle.

use super::{check_arity, str_arg, TupleAction};
use crate::buildinfo::BuildInfo;
use crate::error::{ActionError, ValidationError};
use crate::task::TIMER_ACTION;
use serde_yaml::Value;
use tracing::debug;

pub struct SetTimer;

fn timer_name(args: &[Value]) -> Result<&str, String> {
    check_arity(args, 1, 1)?;
    str_arg(args, 0, "timer name")
}

impl TupleAction for SetTimer {
    const NAME: &'static str = TIMER_ACTION;

    fn validate_tuple(args: &[Value]) -> Result<(), ValidationError> {
        timer_name(args)
            .map(|_| ())
            .map_err(|reason| ValidationError::new(Self::NAME, reason))
    }

    fn run_tuple(args: &[Value], build: &mut BuildInfo) -> Result<(), ActionError> {
        let name = timer_name(args).map_err(|reason| ActionError::new(Self::NAME, reason))?;
        debug!("Timer {} set", name);
        build.record_timer(name);
        Ok(())
    }
}
