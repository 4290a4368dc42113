use shared::protocol::{MetricRecord, MetricResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToggleLabel {
    #[default]
    View,
    Hide,
}

impl ToggleLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "View",
            Self::Hide => "Hide",
        }
    }
}

/// The shown list plus whatever is parked while one record is drilled into.
///
/// `label == Hide` exactly when `shown` is the single-record view and `hidden` holds the
/// full list.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct MetricsView {
    shown: Vec<MetricRecord>,
    hidden: Vec<MetricRecord>,
    responses: Option<Vec<MetricResponse>>,
    label: ToggleLabel,
}

impl MetricsView {
    /// Installs a freshly fetched list. Any open drill-down is closed first.
    pub(crate) fn replace(&mut self, items: Vec<MetricRecord>) {
        self.hidden.clear();
        self.responses = None;
        self.label = ToggleLabel::View;
        self.shown = items;
    }

    pub(crate) fn toggle(&mut self, id: &str, responses: Vec<MetricResponse>) {
        match self.label {
            ToggleLabel::View => {
                let selected = self
                    .shown
                    .iter()
                    .filter(|m| m.id == id)
                    .cloned()
                    .collect();
                self.hidden = std::mem::replace(&mut self.shown, selected);
                self.responses = Some(responses);
                self.label = ToggleLabel::Hide;
            }
            ToggleLabel::Hide => {
                self.shown = std::mem::take(&mut self.hidden);
                self.responses = None;
                self.label = ToggleLabel::View;
            }
        }
    }

    pub(crate) fn shown(&self) -> &[MetricRecord] {
        &self.shown
    }

    pub(crate) fn hidden(&self) -> &[MetricRecord] {
        &self.hidden
    }

    pub(crate) fn responses(&self) -> Option<&[MetricResponse]> {
        self.responses.as_deref()
    }

    pub(crate) fn label(&self) -> ToggleLabel {
        self.label
    }
}
