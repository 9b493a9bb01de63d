use crate::models::{DashboardWidget, WidgetSize};

pub fn default_layout() -> Vec<DashboardWidget> {
    [
        ("statistics", "StatisticsCards", WidgetSize::Large),
        ("probability", "ProbabilitySection", WidgetSize::Medium),
        ("charts", "EnhancedChartSection", WidgetSize::Large),
        ("results", "ResultsTable", WidgetSize::Large),
    ]
    .into_iter()
    .enumerate()
    .map(|(position, (id, component, size))| DashboardWidget {
        id: id.to_string(),
        component: component.to_string(),
        position: position as u32,
        visible: true,
        size: Some(size),
    })
    .collect()
}

/// Move a widget to `target_position` and renumber positions from zero.
///
/// Targets past the end land last. An unknown id leaves the layout untouched.
pub fn move_widget(widgets: &[DashboardWidget], widget_id: &str, target_position: usize) -> Vec<DashboardWidget> {
    let mut ordered = widgets.to_vec();
    ordered.sort_by_key(|w| w.position);

    let Some(from) = ordered.iter().position(|w| w.id == widget_id) else {
        return widgets.to_vec();
    };

    let dragged = ordered.remove(from);
    let target = target_position.min(ordered.len());
    ordered.insert(target, dragged);

    renumber(ordered)
}

/// Flip one widget's visibility; returns `None` for an unknown id.
pub fn toggle_visibility(widgets: &[DashboardWidget], widget_id: &str) -> Option<Vec<DashboardWidget>> {
    if !widgets.iter().any(|w| w.id == widget_id) {
        return None;
    }

    Some(
        widgets
            .iter()
            .map(|w| {
                let mut widget = w.clone();
                if widget.id == widget_id {
                    widget.visible = !widget.visible;
                }
                widget
            })
            .collect(),
    )
}

pub fn visible_widgets(widgets: &[DashboardWidget]) -> Vec<DashboardWidget> {
    let mut visible: Vec<DashboardWidget> = widgets.iter().filter(|w| w.visible).cloned().collect();
    visible.sort_by_key(|w| w.position);
    visible
}

fn renumber(widgets: Vec<DashboardWidget>) -> Vec<DashboardWidget> {
    widgets
        .into_iter()
        .enumerate()
        .map(|(position, widget)| DashboardWidget {
            position: position as u32,
            ..widget
        })
        .collect()
}
