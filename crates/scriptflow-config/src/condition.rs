use serde::{Deserialize, Serialize};

/// An edge condition deciding whether a downstream node runs or is skipped.
///
/// Conditions are evaluated against the recorded results of already-executed
/// nodes. `Success` and `Failed` reference a predecessor by id; `Expression`
/// carries a restricted boolean expression evaluated over a read-only context
/// of prior node results (never a general-purpose code evaluator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionDef {
  /// True iff the referenced node finished with status `success`.
  Success { node_id: String },
  /// True iff the referenced node finished with status `failed`.
  Failed { node_id: String },
  /// Restricted boolean expression over prior node results.
  Expression { expression: String },
}
