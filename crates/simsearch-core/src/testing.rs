//! In-memory port implementations shared by the unit tests.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

use simsearch_types::embedding::{AnnualMeanRecipe, YearEmbeddingHandle};
use simsearch_types::error::PipelineError;
use simsearch_types::plot::{PlotDataset, PlotRecord};
use simsearch_types::table::DatasetRef;
use simsearch_types::task::TaskState;

use crate::port::compute::EmbeddingCompute;
use crate::port::plots::PlotReader;
use crate::port::task::RemoteTask;
use crate::port::warehouse::{Row, Warehouse};

pub(crate) fn dataset(rows: usize) -> PlotDataset {
    let records = (1..=rows as i64)
        .map(|plotid| PlotRecord {
            plotid,
            center_lon: -60.0 + plotid as f64 * 0.001,
            center_lat: -3.0,
            size_m: 30,
        })
        .collect();
    PlotDataset::new(records).unwrap()
}

pub(crate) fn target() -> DatasetRef {
    DatasetRef::new("test-project", "test_dataset")
}

// --- RemoteTask ---

/// Task that reports a fixed sequence of states, repeating the last one.
pub(crate) struct ScriptedTask {
    id: String,
    script: Mutex<VecDeque<TaskState>>,
    last: Mutex<TaskState>,
    polls: Arc<AtomicUsize>,
}

impl ScriptedTask {
    pub(crate) fn new(id: &str, states: &[TaskState]) -> Self {
        Self {
            id: id.to_string(),
            script: Mutex::new(states.iter().copied().collect()),
            last: Mutex::new(*states.last().unwrap_or(&TaskState::Completed)),
            polls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

impl RemoteTask for ScriptedTask {
    fn id(&self) -> &str {
        &self.id
    }

    async fn state(&self) -> Result<TaskState, PipelineError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(state) => {
                *self.last.lock().unwrap() = state;
                Ok(state)
            }
            None => Ok(*self.last.lock().unwrap()),
        }
    }
}

// --- EmbeddingCompute ---

pub(crate) struct MockCompute {
    pub(crate) aggregated: Mutex<Vec<AnnualMeanRecipe>>,
    pub(crate) exported: Mutex<Vec<String>>,
    export_script: Vec<TaskState>,
    failing_year: Option<i32>,
}

impl MockCompute {
    pub(crate) fn new() -> Self {
        Self {
            aggregated: Mutex::new(Vec::new()),
            exported: Mutex::new(Vec::new()),
            export_script: vec![TaskState::Ready, TaskState::Running, TaskState::Completed],
            failing_year: None,
        }
    }

    /// Export submission for `year` fails outright.
    pub(crate) fn failing_export(mut self, year: i32) -> Self {
        self.failing_year = Some(year);
        self
    }

    pub(crate) fn with_export_script(mut self, states: &[TaskState]) -> Self {
        self.export_script = states.to_vec();
        self
    }

    pub(crate) fn exported(&self) -> Vec<String> {
        self.exported.lock().unwrap().clone()
    }
}

impl EmbeddingCompute for MockCompute {
    type Export = ScriptedTask;

    async fn aggregate(
        &self,
        plots: &PlotDataset,
        recipe: &AnnualMeanRecipe,
    ) -> Result<YearEmbeddingHandle, PipelineError> {
        self.aggregated.lock().unwrap().push(recipe.clone());
        Ok(YearEmbeddingHandle::new(
            recipe.year,
            json!({ "year": recipe.year, "plots": plots.row_count() }),
        ))
    }

    async fn export_table(
        &self,
        handle: YearEmbeddingHandle,
        target: &DatasetRef,
        table: &str,
        _overwrite: bool,
    ) -> Result<ScriptedTask, PipelineError> {
        if self.failing_year == Some(handle.year()) {
            return Err(PipelineError::Compute(format!(
                "export quota exceeded for {}",
                handle.year()
            )));
        }
        let qualified = target.qualify(table);
        self.exported.lock().unwrap().push(qualified.clone());
        Ok(ScriptedTask::new(&format!("export:{qualified}"), &self.export_script))
    }
}

// --- Warehouse ---

/// Warehouse double that records every call in order.
///
/// Jobs whose SQL contains one of the `failing` fragments report FAILED.
pub(crate) struct MockWarehouse {
    pub(crate) events: Mutex<Vec<String>>,
    pub(crate) queries: Mutex<Vec<String>>,
    existing: Mutex<HashSet<String>>,
    failing: Vec<String>,
    rows: Vec<Row>,
}

impl MockWarehouse {
    pub(crate) fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            existing: Mutex::new(HashSet::new()),
            failing: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub(crate) fn failing_on(mut self, fragment: &str) -> Self {
        self.failing.push(fragment.to_string());
        self
    }

    pub(crate) fn with_table(self, table: &str) -> Self {
        self.existing.lock().unwrap().insert(table.to_string());
        self
    }

    pub(crate) fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub(crate) fn index_queries(&self) -> Vec<String> {
        self.queries()
            .into_iter()
            .filter(|q| q.starts_with("CREATE VECTOR INDEX"))
            .collect()
    }
}

impl Warehouse for MockWarehouse {
    type Job = ScriptedTask;

    async fn submit_query(&self, project: &str, sql: &str) -> Result<ScriptedTask, PipelineError> {
        let n = {
            let mut queries = self.queries.lock().unwrap();
            queries.push(sql.to_string());
            queries.len()
        };
        self.events.lock().unwrap().push(format!("submit:{project}"));
        let fails = self.failing.iter().any(|f| sql.contains(f.as_str()));
        let script: &[TaskState] = if fails {
            &[TaskState::Running, TaskState::Failed]
        } else {
            &[TaskState::Running, TaskState::Completed]
        };
        Ok(ScriptedTask::new(&format!("job-{n}"), script))
    }

    async fn table_exists(&self, target: &DatasetRef, table: &str) -> Result<bool, PipelineError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("exists:{}", target.qualify(table)));
        Ok(self.existing.lock().unwrap().contains(table))
    }

    async fn delete_table(&self, target: &DatasetRef, table: &str) -> Result<bool, PipelineError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("delete:{}", target.qualify(table)));
        Ok(self.existing.lock().unwrap().remove(table))
    }

    async fn fetch_rows(&self, _project: &str, sql: &str) -> Result<Vec<Row>, PipelineError> {
        self.queries.lock().unwrap().push(sql.to_string());
        self.events.lock().unwrap().push("fetch".to_string());
        Ok(self.rows.clone())
    }
}

// --- PlotReader ---

pub(crate) struct MockReader {
    rows: usize,
    pub(crate) reads: AtomicUsize,
}

impl MockReader {
    pub(crate) fn with_rows(rows: usize) -> Self {
        Self {
            rows,
            reads: AtomicUsize::new(0),
        }
    }
}

impl PlotReader for MockReader {
    async fn read(&self, _source: &str) -> Result<PlotDataset, PipelineError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(dataset(self.rows))
    }
}
