use std::collections::HashSet;

use chrono::{DateTime, Local};
use plotly::{
    layout::{Axis, Margin},
    Configuration, Layout, Plot, Scatter,
};
use yew::prelude::*;

use crate::models::{DataEntry, FieldMap};
use crate::utils;

#[derive(Properties, PartialEq)]
pub struct ChartProps {
    pub id: String,
    pub label: String,
    /// (unix millis, value) pairs, already in time order.
    pub datapoints: Vec<(i64, f64)>,
}

#[function_component(FieldChart)]
fn field_chart(props: &ChartProps) -> Html {
    let id = props.id.clone();
    let p = yew_hooks::use_async::<_, _, ()>({
        let mut plot = Plot::new();
        let trace = Scatter::new(
            props
                .datapoints
                .iter()
                .map(|(ts, _)| DateTime::<Local>::from(utils::utc_from_millis(*ts)))
                .collect(),
            props.datapoints.iter().map(|(_, v)| *v).collect(),
        )
        .text(&props.label);
        plot.add_trace(trace);
        plot.set_configuration(
            Configuration::default()
                .display_logo(false)
                .editable(false)
                .display_mode_bar(plotly::configuration::DisplayModeBar::Hover),
        );
        plot.set_layout(
            Layout::default()
                .hover_mode(plotly::layout::HoverMode::XUnified)
                .auto_size(true)
                .margin(Margin::default().top(20).bottom(40).left(40).right(20))
                .x_axis(Axis::new().title(plotly::common::Title::new(&props.label))),
        );

        async move {
            plotly::bindings::new_plot(&id, &plot).await;
            Ok(())
        }
    });

    use_effect_with(props.datapoints.clone(), move |_| {
        p.run();
    });

    html! {
        <div class="chart" id={props.id.clone()}></div>
    }
}

#[derive(Properties, PartialEq)]
pub struct GraphsProps {
    pub entries: Vec<DataEntry>,
    pub fields: FieldMap,
}

/// One line chart per numeric field, with per-field show/hide toggles.
/// Fields without a single numeric sample are skipped; the data table
/// remains the fallback for those.
#[function_component(DeviceDataGraphs)]
pub fn device_data_graphs(props: &GraphsProps) -> Html {
    let hidden = use_state(HashSet::<String>::new);

    let mut series: Vec<(String, String, Vec<(i64, f64)>)> = Vec::new();
    for (key, label) in props.fields.iter() {
        let mut points: Vec<(i64, f64)> = props
            .entries
            .iter()
            .filter_map(|entry| {
                let ts = utils::parse_timestamp(&entry.created_at)?.timestamp_millis();
                Some((ts, entry.numeric(key)?))
            })
            .collect();
        if points.is_empty() {
            continue;
        }
        points.sort_by_key(|(ts, _)| *ts);
        series.push((key.to_string(), label.to_string(), points));
    }

    if series.is_empty() {
        return html! {
            <div class="empty-state">
                <p>{ "No numeric sensor data to chart." }</p>
            </div>
        };
    }

    let all_keys: Vec<String> = series.iter().map(|(key, _, _)| key.clone()).collect();
    let show_all = {
        let hidden = hidden.clone();
        Callback::from(move |_| hidden.set(HashSet::new()))
    };
    let hide_all = {
        let hidden = hidden.clone();
        let all_keys = all_keys.clone();
        Callback::from(move |_| hidden.set(all_keys.iter().cloned().collect()))
    };

    let toggles: Html = series
        .iter()
        .map(|(key, label, _)| {
            let key = key.clone();
            let hidden = hidden.clone();
            let checked = !hidden.contains(&key);
            let onchange = Callback::from(move |_| {
                let mut next = (*hidden).clone();
                if !next.remove(&key) {
                    next.insert(key.clone());
                }
                hidden.set(next);
            });
            html! {
                <label class="chart-toggle">
                    <input type="checkbox" {checked} {onchange} />
                    { format!(" {label}") }
                </label>
            }
        })
        .collect();

    let charts: Html = series
        .iter()
        .filter(|(key, _, _)| !hidden.contains(key))
        .map(|(key, label, points)| {
            html! {
                <div class="panel">
                    <div class="panel-heading"><h3 class="panel-title">{ label.clone() }</h3></div>
                    <div class="panel-body">
                        <FieldChart id={format!("chart-{key}")} label={label.clone()}
                            datapoints={points.clone()} />
                    </div>
                </div>
            }
        })
        .collect();

    html! {
        <div class="graphs">
            <div class="graphs-toolbar">
                <button class="btn" onclick={show_all}>{ "Show All" }</button>
                <button class="btn" onclick={hide_all}>{ "Hide All" }</button>
                { toggles }
            </div>
            { charts }
        </div>
    }
}
