use crate::core::attributes::AttributeContainer;
use crate::core::components::state::ComponentState;
use crate::core::components::traits::WorkspaceComponent;
use crate::core::errors::{AttributeError, ComponentError};
use crate::core::types::ComponentId;
use crate::core::values::{AttributeType, AttributeValue};
use log::trace;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const TABLE_COMPONENT_TYPE: &str = "table";

/// Container key of the whole-row attributes
pub const ROW_CONTAINER: &str = "row";

/// Rows of numbers with a cursor
#[derive(Debug, Clone, PartialEq)]
pub struct TableData {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
    current_row: usize,
}

impl TableData {
    fn cell(&self, column: usize) -> f64 {
        self.rows
            .get(self.current_row)
            .and_then(|row| row.get(column))
            .copied()
            .unwrap_or(0.0)
    }

    fn set_cell(&mut self, column: usize, value: f64) {
        if let Some(cell) = self
            .rows
            .get_mut(self.current_row)
            .and_then(|row| row.get_mut(column))
        {
            *cell = value;
        }
    }

    fn row(&self) -> Vec<f64> {
        self.rows
            .get(self.current_row)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.columns.len()])
    }

    fn set_row(&mut self, values: &[f64]) -> Result<(), AttributeError> {
        if values.len() != self.columns.len() {
            return Err(AttributeError::Failed(format!(
                "row has {} columns, got {} values",
                self.columns.len(),
                values.len()
            )));
        }
        if let Some(row) = self.rows.get_mut(self.current_row) {
            row.copy_from_slice(values);
        }
        Ok(())
    }
}

/// Data table world: every update moves the cursor to the next row
///
/// Each column is exposed as a container holding a scalar `value` producer
/// and consumer on the current cell. The `row` container exposes the whole
/// current row as a vector.
pub struct TableComponent {
    id: ComponentId,
    state: ComponentState,
    data: Arc<RwLock<TableData>>,
    stop_at_end: AtomicBool,
    at_end: AtomicBool,
}

impl TableComponent {
    /// Rows are padded or truncated to the column count
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, 0.0);
                row
            })
            .collect();
        Self {
            id: ComponentId::new(name, TABLE_COMPONENT_TYPE),
            state: ComponentState::new(),
            data: Arc::new(RwLock::new(TableData {
                columns,
                rows,
                current_row: 0,
            })),
            stop_at_end: AtomicBool::new(false),
            at_end: AtomicBool::new(false),
        }
    }

    /// Ask a continuous run to halt once the last row has been reached
    pub fn with_stop_at_end(self, stop: bool) -> Self {
        self.stop_at_end.store(stop, Ordering::SeqCst);
        self
    }

    pub fn columns(&self) -> Vec<String> {
        self.data.read().columns.clone()
    }

    pub fn row_count(&self) -> usize {
        self.data.read().rows.len()
    }

    pub fn current_row(&self) -> usize {
        self.data.read().current_row
    }

    pub fn set_current_row(&self, row: usize) {
        let mut data = self.data.write();
        data.current_row = if data.rows.is_empty() { 0 } else { row % data.rows.len() };
        self.at_end.store(false, Ordering::SeqCst);
    }

    pub fn value(&self, row: usize, column: usize) -> Option<f64> {
        self.data.read().rows.get(row).and_then(|r| r.get(column)).copied()
    }

    pub fn set_value(&self, row: usize, column: usize, value: f64) -> bool {
        let mut data = self.data.write();
        match data.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            Some(cell) => {
                *cell = value;
                self.state.set_changed_since_last_save(true);
                true
            }
            None => false,
        }
    }

    /// Values of the row under the cursor
    pub fn current_values(&self) -> Vec<f64> {
        self.data.read().row()
    }
}

impl WorkspaceComponent for TableComponent {
    fn id(&self) -> &ComponentId {
        &self.id
    }

    fn state(&self) -> &ComponentState {
        &self.state
    }

    fn update(&self) -> Result<(), ComponentError> {
        let mut data = self.data.write();
        if data.rows.is_empty() {
            return Ok(());
        }
        let next = data.current_row + 1;
        if next >= data.rows.len() {
            data.current_row = 0;
            self.at_end.store(true, Ordering::SeqCst);
        } else {
            data.current_row = next;
        }
        trace!("{} advanced to row {}", self.id, data.current_row);
        Ok(())
    }

    fn attribute_containers(&self) -> Vec<AttributeContainer> {
        let columns = self.columns();
        let mut containers: Vec<AttributeContainer> = columns
            .iter()
            .enumerate()
            .map(|(column, name)| {
                AttributeContainer::bind(self.id.container(name), &self.data)
                    .producer("value", AttributeType::Scalar, "Current cell", move |data| {
                        AttributeValue::Scalar(data.cell(column))
                    })
                    .consumer("value", AttributeType::Scalar, "Current cell", move |data, value| {
                        data.set_cell(column, value.as_scalar()?);
                        Ok(())
                    })
                    .build()
            })
            .collect();

        containers.push(
            AttributeContainer::bind(self.id.container(ROW_CONTAINER), &self.data)
                .producer("values", AttributeType::Vector, "Current row", |data| {
                    AttributeValue::Vector(data.row())
                })
                .consumer("values", AttributeType::Vector, "Current row", |data, value| {
                    data.set_row(value.as_vector()?)
                })
                .build(),
        );
        containers
    }

    fn halt_requested(&self) -> bool {
        self.stop_at_end.load(Ordering::SeqCst) && self.at_end.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableComponent {
        TableComponent::new(
            "data",
            vec!["x".to_string(), "y".to_string()],
            vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0]],
        )
    }

    #[test]
    fn test_rows_are_padded_to_width() {
        let table = table();
        assert_eq!(table.value(2, 1), Some(0.0));
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn test_update_advances_and_wraps() {
        let table = table().with_stop_at_end(true);
        table.update().unwrap();
        assert_eq!(table.current_row(), 1);
        assert!(!table.halt_requested());
        table.update().unwrap();
        table.update().unwrap();
        assert_eq!(table.current_row(), 0);
        assert!(table.halt_requested());
    }

    #[test]
    fn test_column_container_reads_and_writes_current_cell() {
        let table = table();
        let container = table.attribute_container("y").unwrap();
        let producer = container.producer("value").unwrap();
        assert_eq!(producer.read().unwrap(), AttributeValue::Scalar(2.0));

        container.consumer("value").unwrap().write(AttributeValue::Scalar(9.0)).unwrap();
        assert_eq!(table.value(0, 1), Some(9.0));
    }

    #[test]
    fn test_row_container_rejects_wrong_width() {
        let table = table();
        let container = table.attribute_container(ROW_CONTAINER).unwrap();
        let consumer = container.consumer("values").unwrap();

        assert!(consumer.write(AttributeValue::Vector(vec![1.0])).is_err());
        consumer.write(AttributeValue::Vector(vec![7.0, 8.0])).unwrap();
        assert_eq!(table.current_values(), vec![7.0, 8.0]);
    }
}
