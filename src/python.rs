//! Python bindings for the policy parser using PyO3.
//!
//! This module provides Python-friendly wrappers around the core Rust types.

use pyo3::exceptions::{PyIOError, PyLookupError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::{
    ArtifactKind, DecodeOptions, InfDocument, InfParser, PolicyError, PolicyFile, RecordEntry,
    SearchPattern, XmlParser, XmlValue,
};

/// Convert Rust PolicyError to Python exception
fn policy_error_to_py(err: PolicyError) -> PyErr {
    match err {
        PolicyError::Io(_) | PolicyError::FileAccess { .. } => PyIOError::new_err(err.to_string()),
        PolicyError::NothingFound { .. } => PyLookupError::new_err(err.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

/// Runs `f` without the GIL, turning a panic into a Python exception.
fn run_released<T, F>(py: Python<'_>, f: F) -> PyResult<T>
where
    T: Send,
    F: FnOnce() -> Result<T, PolicyError> + Send,
{
    py.allow_threads(move || {
        catch_unwind(AssertUnwindSafe(f))
            .map_err(|panic_err| {
                let panic_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    format!("Rust panic: {}", s)
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    format!("Rust panic: {}", s)
                } else {
                    "Rust panic: unknown error".to_string()
                };
                PyRuntimeError::new_err(panic_msg)
            })?
            .map_err(policy_error_to_py)
    })
}

/// Convert an XML tree into nested dicts and lists
fn xml_to_py(py: Python<'_>, value: &XmlValue) -> PyResult<PyObject> {
    Ok(match value {
        XmlValue::Null => py.None(),
        XmlValue::Text(text) => text.to_object(py),
        XmlValue::List(items) => {
            let items = items
                .iter()
                .map(|item| xml_to_py(py, item))
                .collect::<PyResult<Vec<_>>>()?;
            PyList::new(py, items).to_object(py)
        }
        XmlValue::Map(map) => {
            let dict = PyDict::new(py);
            for (key, item) in map.iter() {
                dict.set_item(key, xml_to_py(py, item)?)?;
            }
            dict.to_object(py)
        }
    })
}

fn options(parallel: bool, blob_threshold: usize) -> DecodeOptions {
    DecodeOptions::default()
        .with_parallel(parallel)
        .with_blob_threshold(blob_threshold)
}

/// Python wrapper for RecordEntry
#[pyclass(name = "RecordEntry")]
#[derive(Clone)]
pub struct PyRecordEntry {
    inner: RecordEntry,
}

#[pymethods]
impl PyRecordEntry {
    /// Hive abbreviation ("HKCU", "HKLM" or "?")
    #[getter]
    fn hive(&self) -> &'static str {
        self.inner.hive.as_str()
    }

    /// Registry key path
    #[getter]
    fn key(&self) -> &str {
        &self.inner.key
    }

    /// Value name
    #[getter]
    fn value(&self) -> &str {
        &self.inner.value_name
    }

    /// Type name (e.g., "REG_SZ", "REG_DWORD")
    #[getter]
    fn value_type(&self) -> &'static str {
        self.inner.type_name()
    }

    /// Rendered data
    #[getter]
    fn data(&self) -> String {
        self.inner.rendered_data()
    }

    /// File the record came from
    #[getter]
    fn source(&self) -> &str {
        &self.inner.source
    }

    /// Numeric value of a DWORD record
    fn as_dword(&self) -> PyResult<u32> {
        self.inner
            .data
            .as_u32()
            .ok_or_else(|| PyValueError::new_err("Not a DWORD value"))
    }

    fn __repr__(&self) -> String {
        format!(
            "RecordEntry(hive='{}', key='{}', value='{}', type={})",
            self.inner.hive, self.inner.key, self.inner.value_name, self.inner.value_type
        )
    }

    fn __str__(&self) -> String {
        self.inner.to_string()
    }
}

impl From<RecordEntry> for PyRecordEntry {
    fn from(inner: RecordEntry) -> Self {
        Self { inner }
    }
}

/// Python wrapper for PolicyFile
#[pyclass(name = "PolicyFile")]
pub struct PyPolicyFile {
    inner: PolicyFile,
}

#[pymethods]
impl PyPolicyFile {
    /// Open a Registry.pol file
    #[staticmethod]
    fn open(path: &str, py: Python) -> PyResult<PyPolicyFile> {
        let path = path.to_string();
        let inner = run_released(py, move || PolicyFile::open(path))?;
        Ok(PyPolicyFile { inner })
    }

    /// Wrap in-memory bytes; the label decides the hive
    #[staticmethod]
    fn from_bytes(data: &[u8], label: &str) -> PyPolicyFile {
        PyPolicyFile {
            inner: PolicyFile::from_vec(data.to_vec(), label),
        }
    }

    /// Source label
    #[getter]
    fn label(&self) -> &str {
        self.inner.label()
    }

    /// Hive abbreviation
    #[getter]
    fn hive(&self) -> &'static str {
        self.inner.hive().as_str()
    }

    /// Whether the file starts with a PReg v1 header
    fn has_valid_header(&self) -> bool {
        self.inner
            .header()
            .map(|header| header.is_well_formed())
            .unwrap_or(false)
    }

    /// Decode every complete record
    #[pyo3(signature = (blob_threshold = crate::value::DEFAULT_BLOB_THRESHOLD))]
    fn records(&self, blob_threshold: usize, py: Python) -> PyResult<Vec<PyRecordEntry>> {
        let inner = &self.inner;
        let records = run_released(py, move || Ok(inner.decode(options(false, blob_threshold))))?;
        Ok(records.into_iter().map(PyRecordEntry::from).collect())
    }

    fn __repr__(&self) -> String {
        format!(
            "PolicyFile(label='{}', hive={}, size={})",
            self.inner.label(),
            self.inner.hive(),
            self.inner.as_bytes().len()
        )
    }
}

/// Python wrapper for InfDocument
#[pyclass(name = "InfDocument")]
#[derive(Clone)]
pub struct PyInfDocument {
    inner: InfDocument,
}

#[pymethods]
impl PyInfDocument {
    /// Section names in order
    fn sections(&self) -> Vec<String> {
        self.inner.sections().map(|(name, _)| name.to_string()).collect()
    }

    /// Key/value pairs of a section
    fn section(&self, name: &str) -> Option<BTreeMap<String, String>> {
        self.inner.section(name).cloned()
    }

    /// A single value
    fn get(&self, section: &str, key: &str) -> Option<String> {
        self.inner.get(section, key).map(str::to_string)
    }

    /// (section, key, value) triples whose key or value matches `term`
    fn find(&self, term: &str) -> PyResult<Vec<(String, String, String)>> {
        let pattern = SearchPattern::new(term).map_err(policy_error_to_py)?;
        Ok(pattern
            .find_inf(&self.inner)
            .into_iter()
            .map(|m| (m.section.to_string(), m.key.to_string(), m.value.to_string()))
            .collect())
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __repr__(&self) -> String {
        format!("InfDocument(sections={})", self.inner.len())
    }
}

/// Decode and merge several Registry.pol files.
///
/// Returns the normalized records and a list of (path, error) pairs for the
/// files that could not be read.
#[pyfunction]
#[pyo3(signature = (paths, parallel = true, blob_threshold = crate::value::DEFAULT_BLOB_THRESHOLD))]
fn decode_files(
    paths: Vec<String>,
    parallel: bool,
    blob_threshold: usize,
    py: Python,
) -> PyResult<(Vec<PyRecordEntry>, Vec<(String, String)>)> {
    let report = run_released(py, move || {
        crate::decode_files(&paths, options(parallel, blob_threshold))
    })?;

    let failures = report
        .failures
        .into_iter()
        .map(|f| (f.path.display().to_string(), f.error.to_string()))
        .collect();
    let records = report.results.into_iter().map(PyRecordEntry::from).collect();
    Ok((records, failures))
}

/// Parse and merge several GptTmpl.inf files.
#[pyfunction]
fn parse_inf(paths: Vec<String>, py: Python) -> PyResult<PyInfDocument> {
    let report = run_released(py, move || Ok(InfParser::new()?.parse_files(&paths)))?;
    Ok(PyInfDocument {
        inner: report.document,
    })
}

/// Parse preference XML files of one artifact type (e.g. "groups").
///
/// Returns a dict mapping each file path to its extracted entries and a list
/// of (path, error) pairs for the files that could not be parsed.
#[pyfunction]
fn parse_xml(
    kind: &str,
    paths: Vec<String>,
    py: Python,
) -> PyResult<(PyObject, Vec<(String, String)>)> {
    let kind = ArtifactKind::from_key(kind)
        .ok_or_else(|| PyValueError::new_err(format!("Unknown artifact type: {}", kind)))?;
    let report = run_released(py, move || Ok(XmlParser::new().parse_files(kind, &paths)))?;

    let files = PyDict::new(py);
    for file in &report.files {
        let entries = file
            .entries
            .iter()
            .map(|entry| xml_to_py(py, entry))
            .collect::<PyResult<Vec<_>>>()?;
        files.set_item(file.path.display().to_string(), PyList::new(py, entries))?;
    }
    let failures = report
        .failures
        .into_iter()
        .map(|f| (f.path.display().to_string(), f.error.to_string()))
        .collect();
    Ok((files.to_object(py), failures))
}

/// Decode Registry.pol files and keep the records matching `term`.
#[pyfunction]
#[pyo3(signature = (term, paths, parallel = true))]
fn find(term: &str, paths: Vec<String>, parallel: bool, py: Python) -> PyResult<Vec<PyRecordEntry>> {
    let pattern = SearchPattern::new(term).map_err(policy_error_to_py)?;
    let matches = run_released(py, move || {
        let report = crate::decode_files(&paths, DecodeOptions::default().with_parallel(parallel))?;
        Ok(pattern
            .find_records(&report.results)
            .into_iter()
            .cloned()
            .collect::<Vec<_>>())
    })?;
    Ok(matches.into_iter().map(PyRecordEntry::from).collect())
}

/// Python module definition
#[pymodule]
fn regpol_parser(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyPolicyFile>()?;
    m.add_class::<PyRecordEntry>()?;
    m.add_class::<PyInfDocument>()?;
    m.add_function(wrap_pyfunction!(decode_files, m)?)?;
    m.add_function(wrap_pyfunction!(parse_inf, m)?)?;
    m.add_function(wrap_pyfunction!(parse_xml, m)?)?;
    m.add_function(wrap_pyfunction!(find, m)?)?;

    // Add version constant
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
