use std::collections::HashSet;

use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::models::{DataEntry, FieldMap};
use crate::utils::format_timestamp;

pub const TIMESTAMP_KEY: &str = "timestamp";
pub const DEFAULT_ROWS_PER_PAGE: usize = 10;
/// Placeholder for absent/null cells, visually distinct from an empty value.
pub const EMPTY_CELL: &str = "—";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Client-side sort/filter/visibility/pagination over rows the caller has
/// already fetched. Knows nothing about the domain meaning of any column;
/// columns are derived from the field map alone.
#[derive(Debug, Clone, PartialEq)]
pub struct TableState {
    columns: Vec<Column>,
    hidden: HashSet<String>,
    sort: Option<(String, SortOrder)>,
    filter: String,
    page: usize,
    rows_per_page: usize,
}

/// One page of rows plus the bookkeeping the footer needs.
#[derive(Debug, PartialEq)]
pub struct TableView<'a> {
    pub rows: Vec<&'a DataEntry>,
    pub filtered_total: usize,
    pub page: usize,
    pub page_count: usize,
}

impl TableView<'_> {
    pub fn has_prev(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.page_count
    }
}

impl TableState {
    /// Fixed leading Timestamp column, then one column per field map entry
    /// in map order.
    pub fn new(fields: &FieldMap, rows_per_page: usize) -> Self {
        let mut columns = Vec::with_capacity(fields.len() + 1);
        columns.push(Column {
            key: TIMESTAMP_KEY.to_string(),
            label: "Timestamp".to_string(),
        });
        columns.extend(fields.iter().map(|(key, label)| Column {
            key: key.to_string(),
            label: label.to_string(),
        }));
        Self {
            columns,
            hidden: HashSet::new(),
            sort: None,
            filter: String::new(),
            page: 0,
            rows_per_page: rows_per_page.max(1),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn visible_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| !self.hidden.contains(&c.key))
    }

    pub fn is_visible(&self, key: &str) -> bool {
        !self.hidden.contains(key)
    }

    pub fn toggle_column(&mut self, key: &str) {
        if !self.columns.iter().any(|c| c.key == key) {
            return;
        }
        if !self.hidden.remove(key) {
            self.hidden.insert(key.to_string());
        }
    }

    pub fn sort_order(&self, key: &str) -> Option<SortOrder> {
        match &self.sort {
            Some((k, order)) if k == key => Some(*order),
            _ => None,
        }
    }

    /// Tri-state: unsorted → ascending → descending → unsorted. Clicking a
    /// different column starts it at ascending.
    pub fn cycle_sort(&mut self, key: &str) {
        self.sort = match self.sort_order(key) {
            None => Some((key.to_string(), SortOrder::Ascending)),
            Some(SortOrder::Ascending) => Some((key.to_string(), SortOrder::Descending)),
            Some(SortOrder::Descending) => None,
        };
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.to_string();
        self.page = 0;
    }

    pub fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }

    pub fn next_page(&mut self) {
        self.page += 1;
    }

    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    /// Displayed text of a cell, `None` for absent/null values.
    pub fn cell_text(entry: &DataEntry, key: &str) -> Option<String> {
        if key == TIMESTAMP_KEY {
            Some(format_timestamp(&entry.created_at))
        } else {
            entry.display(key)
        }
    }

    /// Filter, sort and paginate. The free-text filter applies to the
    /// formatted timestamp (case-insensitive substring); sorting is lexical
    /// on the displayed value.
    pub fn view<'a>(&self, entries: &'a [DataEntry]) -> TableView<'a> {
        let needle = self.filter.to_lowercase();
        let mut rows: Vec<&DataEntry> = entries
            .iter()
            .filter(|entry| {
                needle.is_empty()
                    || format_timestamp(&entry.created_at)
                        .to_lowercase()
                        .contains(&needle)
            })
            .collect();

        if let Some((key, order)) = &self.sort {
            rows.sort_by(|a, b| {
                let va = Self::cell_text(a, key).unwrap_or_default();
                let vb = Self::cell_text(b, key).unwrap_or_default();
                match order {
                    SortOrder::Ascending => va.cmp(&vb),
                    SortOrder::Descending => vb.cmp(&va),
                }
            });
        }

        let filtered_total = rows.len();
        let page_count = (filtered_total + self.rows_per_page - 1) / self.rows_per_page;
        let page = self.page.min(page_count.saturating_sub(1));
        let rows = rows
            .into_iter()
            .skip(page * self.rows_per_page)
            .take(self.rows_per_page)
            .collect();

        TableView {
            rows,
            filtered_total,
            page,
            page_count,
        }
    }
}

#[derive(Properties, PartialEq)]
pub struct DataTableProps {
    pub entries: Vec<DataEntry>,
    pub fields: FieldMap,
    #[prop_or(DEFAULT_ROWS_PER_PAGE)]
    pub rows_per_page: usize,
}

#[function_component(DataTable)]
pub fn data_table(props: &DataTableProps) -> Html {
    let state = use_state(|| TableState::new(&props.fields, props.rows_per_page));

    // a new schema invalidates all per-column state; columns are rederived
    // from scratch
    {
        let state = state.clone();
        use_effect_with(
            (props.fields.clone(), props.rows_per_page),
            move |(fields, rows_per_page)| {
                state.set(TableState::new(fields, *rows_per_page));
            },
        );
    }

    let view = state.view(&props.entries);

    let on_filter = {
        let state = state.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            let mut next = (*state).clone();
            next.set_filter(&input.value());
            state.set(next);
        })
    };

    let on_prev = {
        let state = state.clone();
        Callback::from(move |_| {
            let mut next = (*state).clone();
            next.prev_page();
            state.set(next);
        })
    };

    let on_next = {
        let state = state.clone();
        Callback::from(move |_| {
            let mut next = (*state).clone();
            next.next_page();
            state.set(next);
        })
    };

    let column_toggles: Html = state
        .columns()
        .iter()
        .map(|column| {
            let key = column.key.clone();
            let state = state.clone();
            let onchange = {
                let state = state.clone();
                Callback::from(move |_| {
                    let mut next = (*state).clone();
                    next.toggle_column(&key);
                    state.set(next);
                })
            };
            html! {
                <label class="dropdown-item">
                    <input type="checkbox" checked={state.is_visible(&column.key)} {onchange} />
                    { format!(" {}", column.label) }
                </label>
            }
        })
        .collect();

    let header_cells: Html = state
        .visible_columns()
        .map(|column| {
            let key = column.key.clone();
            let state = state.clone();
            let onclick = {
                let state = state.clone();
                Callback::from(move |_| {
                    let mut next = (*state).clone();
                    next.cycle_sort(&key);
                    state.set(next);
                })
            };
            let marker = match state.sort_order(&column.key) {
                Some(SortOrder::Ascending) => " ▲",
                Some(SortOrder::Descending) => " ▼",
                None => "",
            };
            html! {
                <th class="sortable" {onclick}>{ format!("{}{}", column.label, marker) }</th>
            }
        })
        .collect();

    let body_rows: Html = view
        .rows
        .iter()
        .map(|entry| {
            let cells: Html = state
                .visible_columns()
                .map(|column| match TableState::cell_text(entry, &column.key) {
                    Some(text) => html! { <td>{ text }</td> },
                    None => html! { <td class="cell-empty">{ EMPTY_CELL }</td> },
                })
                .collect();
            html! { <tr key={entry.entry_id.to_string()}>{ cells }</tr> }
        })
        .collect();

    html! {
        <div class="data-table">
            <div class="data-table-toolbar">
                <input class="form-control" placeholder="Filter data..."
                    value={state.filter().to_string()} oninput={on_filter} />
                <details class="dropdown">
                    <summary class="btn">{ "Columns ▾" }</summary>
                    <div class="dropdown-menu">{ column_toggles }</div>
                </details>
            </div>
            <table class="table">
                <thead><tr>{ header_cells }</tr></thead>
                <tbody>{ body_rows }</tbody>
            </table>
            <div class="data-table-footer">
                <span class="text-muted">
                    { format!("Showing {} of {} entries", view.rows.len(), view.filtered_total) }
                </span>
                <button class="btn" disabled={!view.has_prev()} onclick={on_prev}>{ "Previous" }</button>
                <button class="btn" disabled={!view.has_next()} onclick={on_next}>{ "Next" }</button>
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldMap;
    use serde_json::json;

    fn fields() -> FieldMap {
        FieldMap::from_pairs(vec![
            ("field1".to_string(), "Temperature".to_string()),
            ("field2".to_string(), "Humidity".to_string()),
        ])
    }

    fn entry(id: i64, created_at: &str, values: serde_json::Value) -> DataEntry {
        let mut entry: DataEntry = serde_json::from_value(values).unwrap();
        entry.entry_id = id;
        entry.created_at = created_at.to_string();
        entry
    }

    fn entries(n: usize) -> Vec<DataEntry> {
        (0..n)
            .map(|i| {
                entry(
                    i as i64,
                    &format!("2024-05-{:02}T10:00:00Z", i + 1),
                    json!({ "field1": format!("{}", 20 + i), "field2": "60" }),
                )
            })
            .collect()
    }

    #[test]
    fn column_count_is_one_plus_field_map_len() {
        let state = TableState::new(&fields(), 10);
        assert_eq!(state.columns().len(), 1 + fields().len());
        assert_eq!(state.columns()[0].key, TIMESTAMP_KEY);
        assert_eq!(state.columns()[1].label, "Temperature");
    }

    #[test]
    fn toggling_visibility_removes_exactly_one_column() {
        let mut state = TableState::new(&fields(), 10);
        state.toggle_column("field1");
        let visible: Vec<_> = state.visible_columns().map(|c| c.key.as_str()).collect();
        assert_eq!(visible, [TIMESTAMP_KEY, "field2"]);

        state.toggle_column("field1");
        assert_eq!(state.visible_columns().count(), 3);
    }

    #[test]
    fn timestamp_column_can_be_hidden_too() {
        let mut state = TableState::new(&fields(), 10);
        state.toggle_column(TIMESTAMP_KEY);
        assert!(!state.is_visible(TIMESTAMP_KEY));
    }

    #[test]
    fn unknown_column_toggle_is_ignored() {
        let mut state = TableState::new(&fields(), 10);
        state.toggle_column("field9");
        assert_eq!(state.visible_columns().count(), 3);
    }

    #[test]
    fn filter_matches_formatted_timestamp_case_insensitive() {
        let rows = entries(5);
        let mut state = TableState::new(&fields(), 10);
        state.set_filter("2024-05-03");
        let view = state.view(&rows);
        assert_eq!(view.filtered_total, 1);
        assert_eq!(view.rows[0].entry_id, 2);

        // subset law: every match contains the needle
        state.set_filter("2024-05");
        let view = state.view(&rows);
        assert_eq!(view.filtered_total, 5);

        state.set_filter("no such date");
        assert_eq!(state.view(&rows).filtered_total, 0);
    }

    #[test]
    fn pagination_page_count_is_ceil() {
        let rows = entries(25);
        let state = TableState::new(&fields(), 10);
        let view = state.view(&rows);
        assert_eq!(view.page_count, 3);
        assert_eq!(view.rows.len(), 10);
        assert!(!view.has_prev());
        assert!(view.has_next());
    }

    #[test]
    fn next_disabled_on_last_page() {
        let rows = entries(25);
        let mut state = TableState::new(&fields(), 10);
        state.next_page();
        state.next_page();
        let view = state.view(&rows);
        assert_eq!(view.page, 2);
        assert_eq!(view.rows.len(), 5);
        assert!(view.has_prev());
        assert!(!view.has_next());
    }

    #[test]
    fn empty_rows_have_no_pages() {
        let state = TableState::new(&fields(), 10);
        let view = state.view(&[]);
        assert_eq!(view.page_count, 0);
        assert!(!view.has_prev());
        assert!(!view.has_next());
        assert_eq!(view.filtered_total, 0);
    }

    #[test]
    fn filter_change_resets_page() {
        let rows = entries(25);
        let mut state = TableState::new(&fields(), 10);
        state.next_page();
        state.set_filter("2024");
        assert_eq!(state.view(&rows).page, 0);
    }

    #[test]
    fn sort_cycles_through_three_states() {
        let mut state = TableState::new(&fields(), 10);
        assert_eq!(state.sort_order("field1"), None);
        state.cycle_sort("field1");
        assert_eq!(state.sort_order("field1"), Some(SortOrder::Ascending));
        state.cycle_sort("field1");
        assert_eq!(state.sort_order("field1"), Some(SortOrder::Descending));
        state.cycle_sort("field1");
        assert_eq!(state.sort_order("field1"), None);

        // switching column restarts at ascending
        state.cycle_sort("field1");
        state.cycle_sort("field2");
        assert_eq!(state.sort_order("field1"), None);
        assert_eq!(state.sort_order("field2"), Some(SortOrder::Ascending));
    }

    #[test]
    fn sort_is_lexical_on_displayed_value() {
        let rows = vec![
            entry(0, "2024-05-01T10:00:00Z", json!({ "field1": "9" })),
            entry(1, "2024-05-02T10:00:00Z", json!({ "field1": "10" })),
        ];
        let mut state = TableState::new(&fields(), 10);
        state.cycle_sort("field1");
        let view = state.view(&rows);
        // lexical, not numeric: "10" < "9"
        assert_eq!(view.rows[0].entry_id, 1);

        state.cycle_sort("field1");
        let view = state.view(&rows);
        assert_eq!(view.rows[0].entry_id, 0);
    }

    #[test]
    fn missing_cell_renders_placeholder() {
        let row = entry(0, "2024-05-01T10:00:00Z", json!({ "field1": "21" }));
        assert_eq!(TableState::cell_text(&row, "field2"), None);
        assert!(TableState::cell_text(&row, TIMESTAMP_KEY).is_some());
    }

    #[test]
    fn unparseable_timestamp_falls_back_to_raw() {
        let row = entry(0, "not-a-date", json!({}));
        assert_eq!(
            TableState::cell_text(&row, TIMESTAMP_KEY).as_deref(),
            Some("not-a-date")
        );
    }

    #[test]
    fn new_field_map_discards_stale_column_state() {
        let mut state = TableState::new(&fields(), 10);
        state.toggle_column("field1");
        state.cycle_sort("field2");

        let replacement = FieldMap::from_pairs(vec![(
            "config1".to_string(),
            "Interval".to_string(),
        )]);
        let state = TableState::new(&replacement, 10);
        assert!(state.is_visible("config1"));
        assert_eq!(state.sort_order("field2"), None);
        assert_eq!(state.columns().len(), 2);
    }
}
