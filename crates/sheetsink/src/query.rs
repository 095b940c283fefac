use crate::params::ParamValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a query sources its parameter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterMode {
    /// Every key comes from the shared global parameter map.
    Global,
    /// Per-query overrides win key-by-key, globals fill the gaps.
    Unique,
}

impl Default for ParameterMode {
    fn default() -> Self {
        ParameterMode::Global
    }
}

/// A named query as configured by the user: which remote statement to run,
/// which parameter keys it declares, and where its output table should land.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDef {
    pub id: String,
    pub api_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parameter_keys: Vec<String>,
    #[serde(default)]
    pub parameter_mode: ParameterMode,
    #[serde(default)]
    pub parameter_overrides: Option<BTreeMap<String, ParamValue>>,
    pub target_sheet_name: String,
    pub target_table_name: String,
    #[serde(default = "default_include")]
    pub include_in_batch: bool,
}

fn default_include() -> bool {
    true
}

impl QueryDef {
    /// Parse a JSON array of query definitions, in declaration order.
    pub fn list_from_json_str(json: &str) -> Result<Vec<QueryDef>, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Immutable input to one queue execution slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedItem {
    pub id: String,
    pub api_id: String,
    pub parameters: BTreeMap<String, ParamValue>,
    pub target_sheet_name: String,
    pub target_table_name: String,
    pub include_in_batch: bool,
}

impl QueuedItem {
    /// Pair a query definition with its resolved parameters.
    pub fn from_query(query: &QueryDef, parameters: BTreeMap<String, ParamValue>) -> Self {
        Self {
            id: query.id.clone(),
            api_id: query.api_id.clone(),
            parameters,
            target_sheet_name: query.target_sheet_name.clone(),
            target_table_name: query.target_table_name.clone(),
            include_in_batch: query.include_in_batch,
        }
    }
}
