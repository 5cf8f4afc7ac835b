/// Alert rules and the sliding-window rule engine
pub mod alert_rule;
pub mod rule_engine;

pub use alert_rule::{AlertAction, AlertRule, NewAlertRule, RuleConditions, RuleId};
pub use rule_engine::{AlertFiring, RuleEngine};
