use planting_layout_core::{
    OptimizationController, OptimizationError, OptimizationRequest, RunOptions,
    StaticSuitability, SuitabilityTable,
};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

fn to_py_err(err: OptimizationError) -> PyErr {
    if err.is_retryable() {
        PyRuntimeError::new_err(err.to_string())
    } else {
        PyValueError::new_err(err.to_string())
    }
}

/// Optimize spacing for a JSON request and return the JSON response.
///
/// The GIL is released while the search runs.
#[pyfunction]
#[pyo3(signature = (request_json, table_json=None, seed=0, compact=false, max_positions=0))]
fn optimize_layout(
    py: Python<'_>,
    request_json: &str,
    table_json: Option<&str>,
    seed: u64,
    compact: bool,
    max_positions: usize,
) -> PyResult<String> {
    let request: OptimizationRequest = serde_json::from_str(request_json)
        .map_err(|e| PyValueError::new_err(format!("invalid request: {e}")))?;
    let table = match table_json {
        Some(json) => SuitabilityTable::from_json_str(json)
            .map_err(|e| PyValueError::new_err(e.to_string()))?,
        None => SuitabilityTable::builtin(),
    };
    let options = RunOptions {
        seed,
        compact,
        max_positions,
        ..RunOptions::default()
    };
    let source = StaticSuitability::new(table);
    let result = py
        .detach(|| OptimizationController::default().optimize(&request, &source, &options))
        .map_err(to_py_err)?;
    serde_json::to_string(&result.to_response())
        .map_err(|e| PyRuntimeError::new_err(format!("failed to serialize response: {e}")))
}

/// The built-in soil/climate suitability table as JSON.
#[pyfunction]
fn builtin_table() -> PyResult<String> {
    serde_json::to_string(&SuitabilityTable::builtin())
        .map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(optimize_layout, m)?)?;
    m.add_function(wrap_pyfunction!(builtin_table, m)?)?;
    m.add_function(wrap_pyfunction!(version, m)?)?;
    Ok(())
}
