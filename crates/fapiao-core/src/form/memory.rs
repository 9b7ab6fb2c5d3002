//! In-memory form used for headless filling and tests.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::{FormEvent, FormTarget, Selector, TargetResolver, ValueKind};

/// Description of one input element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InputSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Value of the `data-field` attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_field: Option<String>,

    /// HTML input type (`text`, `date`, `number`, ...).
    #[serde(rename = "type")]
    pub input_type: String,

    pub value: String,

    /// Whether the element is inside the viewport.
    pub visible: bool,
}

impl Default for InputSpec {
    fn default() -> Self {
        Self {
            name: None,
            id: None,
            data_field: None,
            input_type: "text".to_string(),
            value: String::new(),
            visible: true,
        }
    }
}

impl InputSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_data_field(field: impl Into<String>) -> Self {
        Self {
            data_field: Some(field.into()),
            ..Self::default()
        }
    }

    pub fn typed(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = input_type.into();
        self
    }

    pub fn valued(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    fn matches(&self, selector: Selector<'_>) -> bool {
        match selector {
            Selector::Name(name) => self.name.as_deref() == Some(name),
            Selector::Id(id) => self.id.as_deref() == Some(id),
            Selector::DataField(field) => self.data_field.as_deref() == Some(field),
        }
    }
}

#[derive(Debug, Default)]
struct InputState {
    spec: InputSpec,
    events: Vec<FormEvent>,
    highlighted_until: Option<Instant>,
    scroll_count: usize,
}

#[derive(Debug, Default)]
struct FormState {
    inputs: Vec<InputState>,
}

/// A form held in memory. Clones share the same inputs.
#[derive(Debug, Clone, Default)]
pub struct MemoryForm {
    state: Arc<Mutex<FormState>>,
}

impl MemoryForm {
    pub fn new(inputs: Vec<InputSpec>) -> Self {
        let form = Self::default();
        for spec in inputs {
            form.push(spec);
        }
        form
    }

    /// Load a form from a JSON array of input descriptions.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let inputs: Vec<InputSpec> = serde_json::from_str(json)?;
        Ok(Self::new(inputs))
    }

    /// Append an input and return its index.
    pub fn push(&self, spec: InputSpec) -> usize {
        let mut state = self.lock();
        state.inputs.push(InputState {
            spec,
            ..InputState::default()
        });
        state.inputs.len() - 1
    }

    /// Snapshot of all inputs, in document order.
    pub fn inputs(&self) -> Vec<InputSpec> {
        self.lock().inputs.iter().map(|i| i.spec.clone()).collect()
    }

    pub fn value_of(&self, index: usize) -> Option<String> {
        self.lock().inputs.get(index).map(|i| i.spec.value.clone())
    }

    /// Notifications raised on an input so far.
    pub fn events_of(&self, index: usize) -> Vec<FormEvent> {
        self.lock()
            .inputs
            .get(index)
            .map(|i| i.events.clone())
            .unwrap_or_default()
    }

    /// Whether the input's highlight is still active.
    pub fn is_highlighted(&self, index: usize) -> bool {
        self.lock()
            .inputs
            .get(index)
            .and_then(|i| i.highlighted_until)
            .is_some_and(|until| Instant::now() < until)
    }

    pub fn scroll_count(&self, index: usize) -> usize {
        self.lock()
            .inputs
            .get(index)
            .map(|i| i.scroll_count)
            .unwrap_or_default()
    }

    /// Overwrite a value directly, as a user typing would.
    pub fn set_value(&self, index: usize, value: &str) {
        if let Some(input) = self.lock().inputs.get_mut(index) {
            input.spec.value = value.to_string();
        }
    }

    fn lock(&self) -> MutexGuard<'_, FormState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TargetResolver for MemoryForm {
    type Target = MemoryTarget;

    fn query(&self, selector: Selector<'_>) -> Option<MemoryTarget> {
        let index = self
            .lock()
            .inputs
            .iter()
            .position(|input| input.spec.matches(selector))?;

        Some(MemoryTarget {
            form: self.clone(),
            index,
        })
    }
}

/// Handle onto one input of a [`MemoryForm`].
#[derive(Debug, Clone)]
pub struct MemoryTarget {
    form: MemoryForm,
    index: usize,
}

impl MemoryTarget {
    /// Position of the input in document order.
    pub fn index(&self) -> usize {
        self.index
    }

    fn with_input<T>(&self, f: impl FnOnce(&mut InputState) -> T) -> Option<T> {
        self.form.lock().inputs.get_mut(self.index).map(f)
    }
}

impl FormTarget for MemoryTarget {
    fn value_kind(&self) -> ValueKind {
        self.with_input(|input| ValueKind::from_input_type(&input.spec.input_type))
            .unwrap_or_default()
    }

    fn value(&self) -> String {
        self.with_input(|input| input.spec.value.clone())
            .unwrap_or_default()
    }

    fn set_value(&self, value: &str) {
        self.with_input(|input| input.spec.value = value.to_string());
    }

    fn dispatch(&self, event: FormEvent) {
        self.with_input(|input| input.events.push(event));
    }

    fn highlight(&self, duration: Duration) {
        self.with_input(|input| input.highlighted_until = Some(Instant::now() + duration));
    }

    fn is_in_viewport(&self) -> bool {
        self.with_input(|input| input.spec.visible).unwrap_or(false)
    }

    fn scroll_into_view(&self) {
        self.with_input(|input| {
            input.spec.visible = true;
            input.scroll_count += 1;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_returns_first_match_in_document_order() {
        let form = MemoryForm::new(vec![
            InputSpec::named("code").valued("first"),
            InputSpec::named("code").valued("second"),
        ]);

        let target = form.query(Selector::Name("code")).unwrap();
        assert_eq!(target.index(), 0);
        assert_eq!(target.value(), "first");
        assert!(form.query(Selector::Id("code")).is_none());
    }

    #[test]
    fn test_from_json() {
        let form = MemoryForm::from_json(
            r#"[
                {"name": "inv_code"},
                {"id": "inv_date", "type": "date", "visible": false},
                {"dataField": "inv_amt", "type": "number", "value": "1.00"}
            ]"#,
        )
        .unwrap();

        let inputs = form.inputs();
        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs[0].input_type, "text");
        assert!(inputs[0].visible);
        assert!(!inputs[1].visible);

        let amount = form.query(Selector::DataField("inv_amt")).unwrap();
        assert_eq!(amount.value_kind(), ValueKind::Number);
        assert_eq!(amount.value(), "1.00");
    }

    #[test]
    fn test_highlight_reverts_after_duration() {
        let form = MemoryForm::new(vec![InputSpec::named("a"), InputSpec::named("b")]);

        form.query(Selector::Name("a")).unwrap().highlight(Duration::from_secs(60));
        form.query(Selector::Name("b")).unwrap().highlight(Duration::ZERO);

        assert!(form.is_highlighted(0));
        assert!(!form.is_highlighted(1));
    }
}
