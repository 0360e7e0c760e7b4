//! The per-patient aggregate the engine mutates as steps run.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use wardflow_core::ir::{Document, Order, PatientInfo};
use wardflow_core::{CoreError, Result};
use wardflow_store::SyncedItem;

/// A patient plus the bookkeeping that links steps together: the order index
/// that lets results find their order, the document index that lets addenda
/// find their document, and the stack of past visit numbers that cancel and
/// delete steps operate on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub info: PatientInfo,
    orders: HashMap<String, Order>,
    past_visits: Vec<u64>,
    documents: HashMap<String, Document>,
}

impl Patient {
    pub fn new(info: PatientInfo) -> Self {
        Self {
            info,
            ..Default::default()
        }
    }

    pub fn mrn(&self) -> &str {
        &self.info.person.mrn
    }

    pub fn order(&self, order_id: &str) -> Option<&Order> {
        self.orders.get(order_id)
    }

    pub fn order_mut(&mut self, order_id: &str) -> Option<&mut Order> {
        self.orders.get_mut(order_id)
    }

    /// Indexes an order under the given id and attaches it to the current
    /// encounter, generating an id when none is supplied. An id that is
    /// already taken leaves the existing order in place. Returns the
    /// effective id.
    pub fn add_order(&mut self, order_id: Option<&str>, order: Order) -> String {
        let order_id = match order_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("generated-{}", self.orders.len()),
        };
        if !self.orders.contains_key(&order_id) {
            self.info.add_order_to_encounter(&order_id, &order);
            self.orders.insert(order_id.clone(), order);
        }
        order_id
    }

    /// Overwrites the order stored under the given id without touching the
    /// encounter, for updates to an order that was already attached.
    pub fn set_order(&mut self, order_id: &str, order: Order) {
        self.orders.insert(order_id.to_string(), order);
    }

    pub fn document(&self, document_id: &str) -> Option<&Document> {
        self.documents.get(document_id)
    }

    pub fn document_mut(&mut self, document_id: &str) -> Option<&mut Document> {
        self.documents.get_mut(document_id)
    }

    /// Indexes a document under the given id, generating an id when none is
    /// supplied. Unlike orders, supplying an existing id replaces the stored
    /// document.
    pub fn add_document(&mut self, document_id: Option<&str>, document: Document) -> String {
        let document_id = match document_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("generated-{}", self.documents.len()),
        };
        self.documents.insert(document_id.clone(), document);
        document_id
    }

    /// Drops every document, as happens when the record is reset after a
    /// discharge. Orders survive resets; documents do not.
    pub fn clear_documents(&mut self) {
        self.documents.clear();
    }

    pub fn push_past_visit(&mut self, visit: u64) {
        self.past_visits.push(visit);
    }

    /// Removes and returns the most recent past visit number.
    pub fn pop_past_visit(&mut self) -> Result<u64> {
        self.past_visits.pop().ok_or(CoreError::PastVisitsEmpty)
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

impl SyncedItem for Patient {
    fn sync_id(&self) -> String {
        self.info.person.mrn.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use wardflow_core::ir::Person;

    fn patient(mrn: &str) -> Patient {
        Patient::new(PatientInfo::new(Person {
            mrn: mrn.to_string(),
            ..Default::default()
        }))
    }

    fn order() -> Order {
        Order {
            order_profile: Some(wardflow_core::ir::CodedElement::new(
                "lpdc-3969",
                "UREA AND ELECTROLYTES",
            )),
            order_date_time: Some(datetime!(2024-05-01 10:00:00 UTC)),
            ..Default::default()
        }
    }

    #[test]
    fn test_add_order_with_explicit_id() {
        let mut p = patient("12345");
        let id = p.add_order(Some("order-1"), order());

        assert_eq!(id, "order-1");
        assert!(p.order("order-1").is_some());
        assert_eq!(p.order_count(), 1);
    }

    #[test]
    fn test_add_order_generates_id_when_missing() {
        let mut p = patient("12345");
        assert_eq!(p.add_order(None, order()), "generated-0");
        assert_eq!(p.add_order(Some(""), order()), "generated-1");
        assert_eq!(p.order_count(), 2);
    }

    #[test]
    fn test_add_order_keeps_existing_order_for_taken_id() {
        let mut p = patient("12345");
        p.add_order(Some("order-1"), order());

        let mut replacement = order();
        replacement.order_status = "CM".to_string();
        let id = p.add_order(Some("order-1"), replacement);

        assert_eq!(id, "order-1");
        assert_eq!(p.order("order-1").unwrap().order_status, "");
        // The encounter got the order exactly once.
        assert_eq!(p.info.encounters.len(), 1);
        assert_eq!(p.info.encounters[0].order_ids.len(), 1);
    }

    #[test]
    fn test_add_document_replaces_for_taken_id() {
        let mut p = patient("12345");
        let doc = Document {
            document_type: "DS".to_string(),
            ..Default::default()
        };
        p.add_document(Some("doc-1"), doc);

        let updated = Document {
            document_type: "AR".to_string(),
            ..Default::default()
        };
        let id = p.add_document(Some("doc-1"), updated);

        assert_eq!(id, "doc-1");
        assert_eq!(p.document("doc-1").unwrap().document_type, "AR");
        assert_eq!(p.document_count(), 1);
    }

    #[test]
    fn test_add_document_generates_id_when_missing() {
        let mut p = patient("12345");
        assert_eq!(p.add_document(None, Document::default()), "generated-0");
        assert_eq!(p.add_document(Some(""), Document::default()), "generated-1");
    }

    #[test]
    fn test_past_visits_pop_in_reverse_order() {
        let mut p = patient("12345");
        p.push_past_visit(100);
        p.push_past_visit(200);

        assert_eq!(p.pop_past_visit().unwrap(), 200);
        assert_eq!(p.pop_past_visit().unwrap(), 100);
    }

    #[test]
    fn test_pop_past_visit_on_empty_stack_errors() {
        let mut p = patient("12345");
        let err = p.pop_past_visit().unwrap_err();
        assert_eq!(err.to_string(), "past visits empty");
        assert!(err.is_state_error());
    }

    #[test]
    fn test_sync_id_is_mrn() {
        assert_eq!(patient("12345").sync_id(), "12345");
    }
}
