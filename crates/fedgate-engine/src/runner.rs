//! Profile execution.
//!
//! Rules run strictly in order against one binding context, accumulating
//! into one result. A break outcome stops further rule consideration but
//! keeps everything accumulated so far; an action error aborts the run and
//! the partial result is discarded with it.

use tracing::{debug, warn};

use crate::action::ActionOutcome;
use crate::context::BindingContext;
use crate::error::EvalResult;
use crate::profile::TranslationProfile;
use crate::result::TranslationResult;

impl TranslationProfile {
    /// Execute the profile against one binding context.
    ///
    /// Condition evaluation failures fail closed: the rule does not fire,
    /// a warning is logged, and the run continues; conditions routinely
    /// probe attributes a given provider may not assert. Action errors
    /// propagate; partially accumulated effects are dropped with them.
    pub fn execute(&self, ctx: &BindingContext) -> EvalResult<TranslationResult> {
        let mut result = TranslationResult::new();

        for (index, rule) in self.rules().iter().enumerate() {
            let fired = match rule.condition.evaluate(ctx) {
                Ok(fired) => fired,
                Err(error) => {
                    warn!(
                        profile = %self.name(),
                        rule = index,
                        condition = %rule.condition.source(),
                        error = %error,
                        "Condition failed to evaluate; rule does not fire"
                    );
                    false
                }
            };

            if !fired {
                debug!(profile = %self.name(), rule = index, "Rule did not fire");
                continue;
            }

            debug!(
                profile = %self.name(),
                rule = index,
                action = %rule.action.name(),
                "Rule fired"
            );

            match rule.action.invoke(ctx, &mut result, self.name())? {
                ActionOutcome::Continue => {}
                ActionOutcome::Break => {
                    debug!(
                        profile = %self.name(),
                        rule = index,
                        "Break signaled; skipping remaining rules"
                    );
                    break;
                }
            }
        }

        Ok(result)
    }
}
