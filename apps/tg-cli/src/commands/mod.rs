pub mod check;
pub mod run;
pub mod tools;
pub mod validate;

use std::path::Path;

use anyhow::Context;
use tg_policy::PolicyEngine;

/// Exit status for a request the policy refused.
pub const EXIT_DENIED: u8 = 2;

pub fn load(policy: &Path) -> anyhow::Result<PolicyEngine> {
    tg_policy::load_engine(policy)
        .with_context(|| format!("loading policy from {}", policy.display()))
}
