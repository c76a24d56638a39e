use nodeflow_config::{NodeData, Values};
use serde_json::json;
use sha2::{Digest, Sha256};

/// SHA-256 over the canonical JSON of a node's inputs and data, rendered as
/// `sha256:<hex>`.
///
/// Object keys serialize in sorted order, so equal inputs hash equally
/// regardless of insertion order.
pub fn config_hash(inputs: &Values, data: &NodeData) -> String {
  let payload = json!({ "inputs": inputs, "data": data });
  let bytes = serde_json::to_vec(&payload).unwrap_or_default();

  let mut hasher = Sha256::new();
  hasher.update(&bytes);
  format!("sha256:{:x}", hasher.finalize())
}
