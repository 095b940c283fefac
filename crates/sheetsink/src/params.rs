use crate::query::ParameterMode;
use sheetsink_host::CellValue;
use std::collections::BTreeMap;

/// Parameter value as fed to a data source; `CellValue::Empty` stands for
/// null and is treated as absent.
pub type ParamValue = CellValue;

fn present<'a>(
    map: Option<&'a BTreeMap<String, ParamValue>>,
    key: &str,
) -> Option<&'a ParamValue> {
    map.and_then(|m| m.get(key)).filter(|v| !v.is_empty())
}

/// Compute the effective parameter map for one query execution.
///
/// In `Unique` mode a per-query override wins for each key it carries;
/// everything else falls back to the global map. Keys with no non-null value
/// in either source are omitted entirely. Pure; callers invoke it fresh
/// immediately before each item runs, because globals may change between
/// items of the same batch.
pub fn effective_params(
    parameter_keys: &[String],
    mode: ParameterMode,
    globals: &BTreeMap<String, ParamValue>,
    overrides: Option<&BTreeMap<String, ParamValue>>,
) -> BTreeMap<String, ParamValue> {
    let mut out = BTreeMap::new();
    for key in parameter_keys {
        if mode == ParameterMode::Unique {
            if let Some(value) = present(overrides, key) {
                out.insert(key.clone(), value.clone());
                continue;
            }
        }
        if let Some(value) = present(Some(globals), key) {
            out.insert(key.clone(), value.clone());
        }
    }
    out
}
