//! Field mapper writing records into form targets.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::invoice::rules::{normalize_amount, normalize_date};
use crate::models::mapping::FieldMapping;
use crate::models::record::InvoiceRecord;

use super::{
    FillFailureReason, FillReport, FormEvent, FormTarget, Selector, TargetResolver, ValueKind,
};

/// Default highlight duration after a target is filled.
pub const DEFAULT_HIGHLIGHT: Duration = Duration::from_millis(2000);

/// Writes invoice records into the targets of one page.
///
/// Never fails: every problem is recorded in the returned [`FillReport`]
/// and processing continues with the next mapping entry.
pub struct FormSync<R: TargetResolver> {
    resolver: R,
    highlight: Duration,
}

impl<R: TargetResolver> FormSync<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            highlight: DEFAULT_HIGHLIGHT,
        }
    }

    /// Set how long a filled target stays highlighted.
    pub fn with_highlight_duration(mut self, duration: Duration) -> Self {
        self.set_highlight_duration(duration);
        self
    }

    pub fn set_highlight_duration(&mut self, duration: Duration) {
        self.highlight = duration;
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Resolve a target id: `name` attribute, then id, then `data-field`.
    pub fn resolve(&self, target_id: &str) -> Option<R::Target> {
        self.resolver
            .query(Selector::Name(target_id))
            .or_else(|| self.resolver.query(Selector::Id(target_id)))
            .or_else(|| self.resolver.query(Selector::DataField(target_id)))
    }

    /// Write every mapped field present in `record`, in mapping order.
    ///
    /// Entries whose field is absent from the record are skipped and appear
    /// in neither `succeeded` nor `failed`.
    pub fn fill(&self, record: &InvoiceRecord, mapping: &FieldMapping) -> FillReport {
        let mut report = FillReport::new(mapping.len());

        for entry in mapping.entries() {
            let Some(raw) = record.get(entry.field) else {
                debug!("No {} in record, skipping {}", entry.field, entry.target_id);
                continue;
            };

            let Some(target) = self.resolve(&entry.target_id) else {
                warn!("Target not found: {}", entry.target_id);
                report.fail(&entry.target_id, FillFailureReason::TargetNotFound);
                continue;
            };

            let value = match format_for_target(target.value_kind(), raw) {
                Ok(value) => value,
                Err(reason) => {
                    warn!("Cannot fill {} with {:?}: {:?}", entry.target_id, raw, reason);
                    report.fail(&entry.target_id, reason);
                    continue;
                }
            };

            write_and_notify(&target, &value);

            target.highlight(self.highlight);
            if !target.is_in_viewport() {
                target.scroll_into_view();
            }

            debug!("Filled {} = {:?}", entry.target_id, value);
            report.succeed(&entry.target_id);
        }

        info!("Form fill: {}", report.summary());
        report
    }

    /// Empty every mapped target that exists. Returns how many were cleared.
    pub fn clear(&self, mapping: &FieldMapping) -> usize {
        let mut cleared = 0;

        for entry in mapping.entries() {
            if let Some(target) = self.resolve(&entry.target_id) {
                write_and_notify(&target, "");
                cleared += 1;
            }
        }

        debug!("Cleared {}/{} targets", cleared, mapping.len());
        cleared
    }

    /// Audit the current target values, independent of any previous fill.
    pub fn validate_fill(&self, mapping: &FieldMapping) -> FillReport {
        let mut report = FillReport::new(mapping.len());

        for entry in mapping.entries() {
            match self.resolve(&entry.target_id) {
                Some(target) if !target.value().trim().is_empty() => {
                    report.succeed(&entry.target_id)
                }
                Some(_) => report.fail(&entry.target_id, FillFailureReason::EmptyValue),
                None => report.fail(&entry.target_id, FillFailureReason::TargetNotFound),
            }
        }

        report
    }

    /// Trimmed current value of every resolvable mapped target.
    pub fn form_data(&self, mapping: &FieldMapping) -> BTreeMap<String, String> {
        mapping
            .entries()
            .iter()
            .filter_map(|entry| {
                self.resolve(&entry.target_id)
                    .map(|target| (entry.target_id.clone(), target.value().trim().to_string()))
            })
            .collect()
    }
}

/// Format a record value for the kind of target receiving it.
fn format_for_target(kind: ValueKind, raw: &str) -> Result<String, FillFailureReason> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FillFailureReason::EmptyValue);
    }

    match kind {
        ValueKind::Date => Ok(normalize_date(trimmed).unwrap_or_else(|| {
            warn!("Unrecognized date {:?}, writing it as-is", trimmed);
            trimmed.to_string()
        })),
        ValueKind::Number => normalize_amount(trimmed).ok_or(FillFailureReason::FormatError),
        ValueKind::Text => Ok(trimmed.to_string()),
    }
}

fn write_and_notify<T: FormTarget>(target: &T, value: &str) {
    target.set_value(value);
    for event in FormEvent::SEQUENCE {
        target.dispatch(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{FillFailure, InputSpec, MemoryForm};
    use crate::models::record::InvoiceField;
    use pretty_assertions::assert_eq;

    fn sample_record() -> InvoiceRecord {
        InvoiceRecord::new()
            .with(InvoiceField::InvoiceCode, "1234567890")
            .with(InvoiceField::InvoiceNumber, "87654321")
            .with(InvoiceField::InvoiceDate, "2024年1月5日")
            .with(InvoiceField::Amount, "100.5")
    }

    fn sample_mapping() -> FieldMapping {
        FieldMapping::new()
            .bind("inv_code", InvoiceField::InvoiceCode)
            .bind("inv_no", InvoiceField::InvoiceNumber)
            .bind("inv_date", InvoiceField::InvoiceDate)
            .bind("inv_amt", InvoiceField::Amount)
    }

    fn sample_form() -> MemoryForm {
        MemoryForm::new(vec![
            InputSpec::named("inv_code"),
            InputSpec::with_id("inv_no").hidden(),
            InputSpec::with_data_field("inv_date").typed("date"),
            InputSpec::named("inv_amt").typed("number"),
        ])
    }

    #[test]
    fn test_fill_reports_missing_target() {
        let form = MemoryForm::new(vec![InputSpec::named("inv_code")]);
        let mapping = FieldMapping::new()
            .bind("inv_code", InvoiceField::InvoiceCode)
            .bind("inv_amt", InvoiceField::Amount);
        let record = InvoiceRecord::new()
            .with(InvoiceField::InvoiceCode, "1234567890")
            .with(InvoiceField::Amount, "100.5");

        let report = FormSync::new(form.clone()).fill(&record, &mapping);

        assert_eq!(report.succeeded, vec!["inv_code".to_string()]);
        assert_eq!(report.failed_ids(), vec!["inv_amt"]);
        assert_eq!(report.failed[0].reason, FillFailureReason::TargetNotFound);
        assert_eq!(report.total, 2);
        assert_eq!(form.value_of(0).as_deref(), Some("1234567890"));
    }

    #[test]
    fn test_resolve_priority() {
        let form = MemoryForm::new(vec![
            InputSpec::with_data_field("code"),
            InputSpec::with_id("code"),
            InputSpec::named("code"),
            InputSpec::with_data_field("amount"),
            InputSpec::with_id("amount"),
        ]);
        let sync = FormSync::new(form);

        assert_eq!(sync.resolve("code").unwrap().index(), 2);
        assert_eq!(sync.resolve("amount").unwrap().index(), 4);
        assert!(sync.resolve("missing").is_none());
    }

    #[test]
    fn test_fill_formats_by_value_kind() {
        let form = sample_form();
        let report = FormSync::new(form.clone()).fill(&sample_record(), &sample_mapping());

        assert!(report.is_valid());
        assert_eq!(report.succeeded.len(), 4);
        assert_eq!(form.value_of(0).as_deref(), Some("1234567890"));
        assert_eq!(form.value_of(1).as_deref(), Some("87654321"));
        assert_eq!(form.value_of(2).as_deref(), Some("2024-01-05"));
        assert_eq!(form.value_of(3).as_deref(), Some("100.50"));
    }

    #[test]
    fn test_fill_raises_notifications_in_order() {
        let form = sample_form();
        FormSync::new(form.clone()).fill(&sample_record(), &sample_mapping());

        for index in 0..4 {
            assert_eq!(
                form.events_of(index),
                vec![FormEvent::Input, FormEvent::Change, FormEvent::Blur]
            );
        }
    }

    #[test]
    fn test_fill_highlights_and_scrolls_hidden_targets() {
        let form = sample_form();
        FormSync::new(form.clone()).fill(&sample_record(), &sample_mapping());

        assert!(form.is_highlighted(0));
        assert_eq!(form.scroll_count(0), 0);
        assert_eq!(form.scroll_count(1), 1);
    }

    #[test]
    fn test_highlight_duration_is_configurable() {
        let form = sample_form();
        FormSync::new(form.clone())
            .with_highlight_duration(Duration::ZERO)
            .fill(&sample_record(), &sample_mapping());

        assert!(!form.is_highlighted(0));
    }

    #[test]
    fn test_absent_fields_are_skipped() {
        let form = sample_form();
        let record = InvoiceRecord::new().with(InvoiceField::InvoiceCode, "1");

        let report = FormSync::new(form.clone()).fill(&record, &sample_mapping());

        assert_eq!(report.succeeded, vec!["inv_code".to_string()]);
        assert!(report.failed.is_empty());
        assert_eq!(report.total, 4);
        assert!(form.events_of(1).is_empty());
    }

    #[test]
    fn test_unresolved_target_does_not_abort() {
        let form = MemoryForm::new(vec![InputSpec::named("last")]);
        let mapping = FieldMapping::new()
            .bind("first", InvoiceField::InvoiceCode)
            .bind("second", InvoiceField::InvoiceNumber)
            .bind("last", InvoiceField::InvoiceDate);

        let report = FormSync::new(form.clone()).fill(&sample_record(), &mapping);

        assert_eq!(report.failed_ids(), vec!["first", "second"]);
        assert_eq!(report.succeeded, vec!["last".to_string()]);
        assert!(!report.succeeded.iter().any(|id| id == "first" || id == "second"));
        assert_eq!(form.value_of(0).as_deref(), Some("2024年1月5日"));
    }

    #[test]
    fn test_numeric_target_never_receives_nan() {
        let form = MemoryForm::new(vec![InputSpec::named("amt").typed("number").valued("9.99")]);
        let mapping = FieldMapping::new().bind("amt", InvoiceField::Amount);
        let record = InvoiceRecord::new().with(InvoiceField::Amount, "NaN");

        let report = FormSync::new(form.clone()).fill(&record, &mapping);

        assert_eq!(
            report.failed,
            vec![FillFailure {
                target_id: "amt".to_string(),
                reason: FillFailureReason::FormatError,
            }]
        );
        assert_eq!(form.value_of(0).as_deref(), Some("9.99"));
        assert!(form.events_of(0).is_empty());
    }

    #[test]
    fn test_numeric_target_rejects_negative_amount() {
        let form = MemoryForm::new(vec![InputSpec::named("amt").typed("number")]);
        let mapping = FieldMapping::new().bind("amt", InvoiceField::Amount);
        let record = InvoiceRecord::new().with(InvoiceField::Amount, "-5");

        let report = FormSync::new(form.clone()).fill(&record, &mapping);

        assert_eq!(report.failed[0].reason, FillFailureReason::FormatError);
        assert_eq!(form.value_of(0).as_deref(), Some(""));
    }

    #[test]
    fn test_unparseable_date_written_as_is() {
        let form = MemoryForm::new(vec![InputSpec::named("d").typed("date")]);
        let mapping = FieldMapping::new().bind("d", InvoiceField::InvoiceDate);
        let record = InvoiceRecord::new().with(InvoiceField::InvoiceDate, " someday ");

        let report = FormSync::new(form.clone()).fill(&record, &mapping);

        assert!(report.is_valid());
        assert_eq!(form.value_of(0).as_deref(), Some("someday"));
    }

    #[test]
    fn test_fill_is_idempotent() {
        let form = sample_form();
        form.push(InputSpec::named("unused"));
        let mapping = sample_mapping().bind("nowhere", InvoiceField::InvoiceCode);
        let sync = FormSync::new(form.clone());

        let first = sync.fill(&sample_record(), &mapping);
        let values_after_first = form.inputs();
        let second = sync.fill(&sample_record(), &mapping);

        assert_eq!(first, second);
        assert_eq!(form.inputs(), values_after_first);
    }

    #[test]
    fn test_fill_then_clear_empties_targets() {
        let form = sample_form();
        let mapping = sample_mapping().bind("nowhere", InvoiceField::Amount);
        let sync = FormSync::new(form.clone());

        sync.fill(&sample_record(), &mapping);
        let cleared = sync.clear(&mapping);

        assert_eq!(cleared, 4);
        for index in 0..4 {
            assert_eq!(form.value_of(index).as_deref(), Some(""));
        }
    }

    #[test]
    fn test_clear_is_idempotent() {
        let form = sample_form();
        let sync = FormSync::new(form.clone());

        sync.clear(&sample_mapping());
        let after_first: Vec<_> = (0..4).map(|i| form.events_of(i)).collect();
        sync.clear(&sample_mapping());

        for index in 0..4 {
            assert_eq!(form.value_of(index).as_deref(), Some(""));
            assert_eq!(after_first[index].len(), 3);
            assert_eq!(form.events_of(index).len(), 6);
            assert_eq!(form.events_of(index)[3..], after_first[index][..]);
        }
    }

    #[test]
    fn test_validate_fill_audits_current_values() {
        let form = sample_form();
        let mapping = sample_mapping().bind("nowhere", InvoiceField::Amount);
        let sync = FormSync::new(form.clone());

        sync.fill(&sample_record(), &mapping);
        form.set_value(1, "   ");

        let audit = sync.validate_fill(&mapping);

        assert_eq!(audit.succeeded, vec!["inv_code", "inv_date", "inv_amt"]);
        assert_eq!(
            audit.failed,
            vec![
                FillFailure {
                    target_id: "inv_no".to_string(),
                    reason: FillFailureReason::EmptyValue,
                },
                FillFailure {
                    target_id: "nowhere".to_string(),
                    reason: FillFailureReason::TargetNotFound,
                },
            ]
        );
        assert_eq!(audit.total, 5);
    }

    #[test]
    fn test_form_data() {
        let form = sample_form();
        let sync = FormSync::new(form.clone());
        sync.fill(&sample_record(), &sample_mapping());

        let data = sync.form_data(&sample_mapping().bind("nowhere", InvoiceField::Amount));

        assert_eq!(data.len(), 4);
        assert_eq!(data["inv_amt"], "100.50");
        assert!(!data.contains_key("nowhere"));
    }
}
