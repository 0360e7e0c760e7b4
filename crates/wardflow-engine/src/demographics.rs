//! Synthetic demographics and clinical artifacts.
//!
//! Pathways describe patients with templates that leave most fields open;
//! this module fills the gaps: names, identifiers, birthdates, doctors,
//! orders, result sets, notes, and documents. Values a template pins stay
//! pinned, everything else is generated.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use time::{Duration, OffsetDateTime, Time};
use wardflow_core::ir::{
    Allergy, ClinicalNote as IrClinicalNote, ClinicalNoteContent, ClinicalResult, CodedElement,
    DIAGNOSTIC_SERV_DOC, Doctor, Document as IrDocument, Order as IrOrder, PatientInfo, Person,
};
use wardflow_core::{CoreError, Result};
use wardflow_pathway::person::random_birthdate;
use wardflow_pathway::step::{
    ClinicalNote as ClinicalNoteStep, Document as DocumentStep, DocumentUpdateType, EMPTY,
    Interval, MIDNIGHT, Order as OrderStep, RANDOM, Results as ResultsStep, TestResult,
    UpdatePerson as UpdatePersonStep,
};
use wardflow_pathway::{Consultant, Delay, PersonTemplate};

/// Patient class of an admitted patient.
pub const INPATIENT: &str = "INPATIENT";
/// Patient class of a patient without an active admission.
pub const OUTPATIENT: &str = "OUTPATIENT";

pub(crate) const ORDER_CONTROL_NEW: &str = "NW";
pub(crate) const ORDER_CONTROL_ACKNOWLEDGED: &str = "OK";
pub(crate) const ORDER_CONTROL_WITH_OBSERVATIONS: &str = "RE";
const ORDER_STATUS_IN_PROCESS: &str = "IP";
const ORDER_STATUS_COMPLETED: &str = "CM";
const RESULT_STATUS_FINAL: &str = "F";
const RESULT_STATUS_CORRECTED: &str = "C";
const DOCUMENT_STATUS_AUTHENTICATED: &str = "AU";
const COMPLETION_STATUS_DOCUMENTED: &str = "DO";

const DEFAULT_HOSPITAL_SERVICE: &str = "180";

const FEMALE_NAMES: &[&str] = &[
    "Alice", "Beatrice", "Carmen", "Daria", "Elena", "Freya", "Grace", "Hanna", "Imogen", "Joan",
    "Katherine", "Lucia", "Mira", "Nadia", "Olga", "Priya",
];
const MALE_NAMES: &[&str] = &[
    "Adam", "Bruno", "Callum", "Dmitri", "Edward", "Felix", "George", "Henry", "Ivan", "James",
    "Kofi", "Liam", "Marcus", "Noel", "Oscar", "Pavel",
];
const SURNAMES: &[&str] = &[
    "Adler", "Bishop", "Chandra", "Dawson", "Ellis", "Ferreira", "Gallagher", "Hendricks",
    "Ivanova", "Jansen", "Kowalski", "Lindgren", "Moretti", "Novak", "Okafor", "Petrov",
];
const WORDS: &[&str] = &[
    "patient", "stable", "review", "observed", "bloods", "taken", "ward", "round", "plan",
    "continue", "monitoring", "fluids", "oral", "intake", "improved", "overnight", "mobile",
    "independently", "discussed", "family", "awaiting", "results", "chased", "tomorrow",
];
const UDN_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const DOCUMENT_TYPES: &[&str] = &["AR", "CD", "CN", "DI", "DS"];
const DEFAULT_CONTENT_LINES: Interval = Interval { from: 10, to: 50 };

/// Generates people, doctors, patients, and the clinical artifacts steps
/// attach to them. MRNs are sequential so that records stay easy to follow
/// in logs; everything else random comes from the thread RNG.
pub struct Demographics {
    mrn_counter: AtomicU64,
}

impl Default for Demographics {
    fn default() -> Self {
        Self::new()
    }
}

impl Demographics {
    pub fn new() -> Self {
        Self {
            mrn_counter: AtomicU64::new(0),
        }
    }

    fn next_mrn(&self) -> String {
        (self.mrn_counter.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }

    /// A new person honoring whatever the template pins.
    pub fn new_person(&self, template: &PersonTemplate, now: OffsetDateTime) -> Person {
        let mut rng = rand::thread_rng();
        let gender = if wants_random(&template.gender) {
            if rng.gen_range(0..2) == 0 { "F" } else { "M" }.to_string()
        } else {
            template.gender.clone()
        };
        let pool = if gender == "F" { FEMALE_NAMES } else { MALE_NAMES };
        let first_name = if wants_random(&template.first_name) {
            pool[rng.gen_range(0..pool.len())].to_string()
        } else {
            template.first_name.clone()
        };
        let surname = if wants_random(&template.surname) {
            SURNAMES[rng.gen_range(0..SURNAMES.len())].to_string()
        } else {
            template.surname.clone()
        };
        let birth = template
            .birthdate(now)
            .unwrap_or_else(|| random_birthdate(now));
        let nhs = if wants_random(&template.nhs) {
            format!("{:010}", rng.gen_range(0..10_000_000_000u64))
        } else {
            template.nhs.clone()
        };
        let mrn = if wants_random(&template.mrn) {
            self.next_mrn()
        } else {
            template.mrn.clone()
        };
        Person {
            first_name,
            surname,
            gender,
            birth: Some(birth),
            phone_number: format!(
                "020 {:04} {:04}",
                rng.gen_range(0..10_000),
                rng.gen_range(0..10_000)
            ),
            mrn,
            nhs,
            ..Default::default()
        }
    }

    /// The consultant as a doctor, with random values filling any field the
    /// pathway leaves out, or a fully random doctor when there is no
    /// consultant at all.
    pub fn new_doctor(&self, consultant: Option<&Consultant>) -> Doctor {
        let random = self.random_doctor();
        match consultant {
            Some(c) => Doctor {
                id: c.id.clone().unwrap_or(random.id),
                surname: c.surname.clone().unwrap_or(random.surname),
                first_name: c.first_name.clone().unwrap_or(random.first_name),
                prefix: c.prefix.clone().unwrap_or(random.prefix),
                specialty: random.specialty,
            },
            None => random,
        }
    }

    fn random_doctor(&self) -> Doctor {
        let mut rng = rand::thread_rng();
        Doctor {
            id: format!("C{:07}", rng.gen_range(0..10_000_000)),
            surname: SURNAMES[rng.gen_range(0..SURNAMES.len())].to_string(),
            first_name: MALE_NAMES[rng.gen_range(0..MALE_NAMES.len())].to_string(),
            prefix: "Dr".to_string(),
            specialty: DEFAULT_HOSPITAL_SERVICE.to_string(),
        }
    }

    /// A fresh outpatient record for the person under the doctor's care.
    pub fn new_patient(
        &self,
        person: Person,
        doctor: Option<Doctor>,
    ) -> wardflow_state::Patient {
        let mut info = PatientInfo::new(person);
        info.class = OUTPATIENT.to_string();
        info.hospital_service = DEFAULT_HOSPITAL_SERVICE.to_string();
        info.attending_doctor = doctor;
        wardflow_state::Patient::new(info)
    }

    /// Resets the record as if the patient were new, keeping their identity
    /// and medical history: person, doctor, hospital service, encounters,
    /// and allergies survive; documents and the visit do not.
    pub fn reset_patient(&self, patient: &mut wardflow_state::Patient) {
        let info = &mut patient.info;
        let person = std::mem::take(&mut info.person);
        let attending_doctor = info.attending_doctor.take();
        let hospital_service = std::mem::take(&mut info.hospital_service);
        let encounters = std::mem::take(&mut info.encounters);
        let allergies = std::mem::take(&mut info.allergies);

        let mut fresh = PatientInfo::new(person);
        fresh.class = OUTPATIENT.to_string();
        fresh.attending_doctor = attending_doctor;
        fresh.hospital_service = hospital_service;
        fresh.encounters = encounters;
        fresh.allergies = allergies;
        *info = fresh;
        patient.clear_documents();
    }

    /// Applies an update-person step to the record: demographics the
    /// template pins, plus the step's diagnoses, procedures, and allergies.
    /// The diagnosis and procedure lists replace the scratch lists awaiting
    /// attachment to the encounter.
    pub fn update_from_pathway(&self, info: &mut PatientInfo, update: &UpdatePersonStep) {
        if let Some(template) = &update.person {
            let person = &mut info.person;
            if !wants_random(&template.first_name) {
                person.first_name = template.first_name.clone();
            }
            if !wants_random(&template.surname) {
                person.surname = template.surname.clone();
            }
            if !wants_random(&template.gender) {
                person.gender = template.gender.clone();
            }
            if !template.nhs.is_empty() {
                person.nhs = template.nhs.clone();
            }
            if template.date_of_birth.is_some() {
                person.birth = template.date_of_birth;
            }
        }
        info.diagnoses = update.diagnoses.clone();
        info.procedures = update.procedures.clone();
        self.add_allergies(info, &update.allergies);
    }

    /// Merges the step's allergies into the record, skipping ones already
    /// present.
    pub fn add_allergies(&self, info: &mut PatientInfo, allergies: &[Allergy]) {
        for allergy in allergies {
            if !info.allergies.contains(allergy) {
                info.allergies.push(allergy.clone());
            }
        }
    }

    pub fn new_visit_id(&self) -> u64 {
        rand::random::<u64>()
    }

    /// A new order for the profile the step names, in process and with a
    /// fresh placer number.
    pub fn new_order(&self, step: &OrderStep, event_time: OffsetDateTime) -> IrOrder {
        let order_status = if step.order_status.is_empty() {
            ORDER_STATUS_IN_PROCESS.to_string()
        } else {
            step.order_status.clone()
        };
        IrOrder {
            order_profile: Some(CodedElement::new(&step.order_profile, &step.order_profile)),
            placer: random_id(),
            order_date_time: Some(event_time),
            order_control: ORDER_CONTROL_NEW.to_string(),
            order_status,
            ..Default::default()
        }
    }

    /// Sets results on the order, creating one first when the results arrive
    /// without a preceding order step.
    ///
    /// The statuses depend on what the order holds: explicit pathway values
    /// win; results on top of a final or corrected report become a
    /// correction; anything else becomes a final report. Collection and
    /// lab-receipt times are picked so that order <= collected <= received
    /// <= reported, and the [`EMPTY`] and [`MIDNIGHT`] keywords override
    /// them afterwards.
    pub fn set_results(
        &self,
        order: Option<IrOrder>,
        step: &ResultsStep,
        event_time: OffsetDateTime,
    ) -> Result<IrOrder> {
        let mut order = order.unwrap_or_else(|| {
            self.new_order(
                &OrderStep {
                    order_profile: step.order_profile.clone(),
                    ..Default::default()
                },
                event_time,
            )
        });
        if order.filler.is_empty() {
            order.filler = random_id();
        }

        if !step.order_status.is_empty() {
            order.order_status = step.order_status.clone();
            order.results_status = step.results_status.clone();
        } else if !order.results.is_empty()
            && (order.results_status == RESULT_STATUS_FINAL
                || order.results_status == RESULT_STATUS_CORRECTED)
        {
            order.order_status = ORDER_STATUS_COMPLETED.to_string();
            order.results_status = RESULT_STATUS_CORRECTED.to_string();
        } else {
            order.order_status = ORDER_STATUS_COMPLETED.to_string();
            order.results_status = RESULT_STATUS_FINAL.to_string();
        }

        order.reported_date_time = Some(event_time);
        if order.results.is_empty() {
            let ordered = order.order_date_time.unwrap_or(event_time);
            let collected = ordered + random_offset_within(event_time - ordered);
            order.collected_date_time = Some(collected);
            order.received_in_lab_date_time =
                Some(collected + random_offset_within(event_time - collected));
        }
        order.collected_date_time =
            overridden_date(&step.collected_date_time, order.collected_date_time)?;
        order.received_in_lab_date_time = overridden_date(
            &step.received_in_lab_date_time,
            order.received_in_lab_date_time,
        )?;

        order.results = step
            .results
            .iter()
            .map(|result| {
                test_result(result, &order.results_status, order.collected_date_time)
            })
            .collect();
        Ok(order)
    }

    /// Builds or extends a clinical-note order. An existing order must hold
    /// exactly one note result; the step's content is appended to it.
    pub fn order_with_note(
        &self,
        order: Option<IrOrder>,
        step: &ClinicalNoteStep,
        event_time: OffsetDateTime,
    ) -> Result<IrOrder> {
        let existing_note = match &order {
            Some(order) => {
                if order.results.len() != 1 {
                    return Err(CoreError::configuration(
                        "a clinical note order must hold exactly one result",
                    ));
                }
                match &order.results[0].clinical_note {
                    Some(note) => Some(note.clone()),
                    None => {
                        return Err(CoreError::configuration(
                            "order is not a clinical note order",
                        ));
                    }
                }
            }
            None => None,
        };
        let note = self.note_for_step(existing_note, step, event_time);

        let mut order = order.unwrap_or_else(|| IrOrder {
            results_status: DOCUMENT_STATUS_AUTHENTICATED.to_string(),
            diagnostic_serv_id: DIAGNOSTIC_SERV_DOC.to_string(),
            ..Default::default()
        });
        order.order_profile = Some(CodedElement::new(&note.document_type, &note.document_type));
        order.results = vec![ClinicalResult {
            clinical_note: Some(note),
            ..Default::default()
        }];
        Ok(order)
    }

    fn note_for_step(
        &self,
        existing: Option<IrClinicalNote>,
        step: &ClinicalNoteStep,
        event_time: OffsetDateTime,
    ) -> IrClinicalNote {
        let date_time = match &step.date_time {
            Some(spec) => spec.resolve(event_time),
            None => Some(event_time),
        };
        let content = ClinicalNoteContent {
            observation_date_time: date_time,
            content_type: step.content_type.clone(),
            document_encoding: String::new(),
            document_content: if step.document_content.is_empty() {
                self.sentences(1).join(" ")
            } else {
                step.document_content.clone()
            },
        };
        match existing {
            Some(mut note) => {
                if !step.document_type.is_empty() {
                    note.document_type = step.document_type.clone();
                }
                if !step.document_title.is_empty() {
                    note.document_title = step.document_title.clone();
                }
                note.contents.push(content);
                note
            }
            None => IrClinicalNote {
                date_time,
                document_title: step.document_title.clone(),
                document_type: step.document_type.clone(),
                document_id: if step.document_id.is_empty() {
                    random_id()
                } else {
                    step.document_id.clone()
                },
                contents: vec![content],
            },
        }
    }

    /// A new document per the step, with generated filler between the
    /// configured header and ending lines.
    pub fn new_document(&self, step: &DocumentStep, event_time: OffsetDateTime) -> IrDocument {
        let mut rng = rand::thread_rng();
        let document_type = if step.document_type.is_empty() {
            DOCUMENT_TYPES[rng.gen_range(0..DOCUMENT_TYPES.len())].to_string()
        } else {
            step.document_type.clone()
        };
        let completion_status = if step.completion_status.is_empty() {
            COMPLETION_STATUS_DOCUMENTED.to_string()
        } else {
            step.completion_status.clone()
        };
        let observation_identifier = CodedElement {
            id: step
                .obs_identifier_id
                .clone()
                .unwrap_or_else(|| "Established Patient Review".to_string()),
            text: step
                .obs_identifier_text
                .clone()
                .unwrap_or_else(|| "Established Patient Review".to_string()),
            coding_system: step
                .obs_identifier_coding_system
                .clone()
                .unwrap_or_else(|| "Wardflow".to_string()),
        };
        IrDocument {
            activity_date_time: Some(event_time),
            edit_date_time: Some(event_time),
            document_type,
            completion_status,
            unique_document_number: random_document_number(),
            observation_identifier: Some(observation_identifier),
            content_lines: self.document_content(step),
        }
    }

    /// Applies an update step to an existing document: append adds the new
    /// content after the existing lines, overwrite replaces them.
    pub fn update_document_content(
        &self,
        document: &mut IrDocument,
        step: &DocumentStep,
        update_type: DocumentUpdateType,
    ) {
        let content = self.document_content(step);
        match update_type {
            DocumentUpdateType::Append => document.content_lines.extend(content),
            DocumentUpdateType::Overwrite => document.content_lines = content,
        }
    }

    fn document_content(&self, step: &DocumentStep) -> Vec<String> {
        let filler = step
            .num_random_content_lines
            .unwrap_or(DEFAULT_CONTENT_LINES)
            .sample()
            .max(0) as usize;
        let mut lines = step.header_content_lines.clone();
        lines.extend(self.sentences(filler));
        lines.extend(step.ending_content_lines.clone());
        lines
    }

    fn sentences(&self, count: usize) -> Vec<String> {
        let mut rng = rand::thread_rng();
        (0..count)
            .map(|_| {
                let length = rng.gen_range(5..12);
                let mut words: Vec<&str> = (0..length)
                    .map(|_| WORDS[rng.gen_range(0..WORDS.len())])
                    .collect();
                let mut sentence = String::new();
                let first = words.remove(0);
                let mut chars = first.chars();
                if let Some(c) = chars.next() {
                    sentence.push(c.to_ascii_uppercase());
                    sentence.push_str(chars.as_str());
                }
                for word in words {
                    sentence.push(' ');
                    sentence.push_str(word);
                }
                sentence.push('.');
                sentence
            })
            .collect()
    }
}

fn wants_random(value: &str) -> bool {
    value.is_empty() || value == RANDOM
}

fn random_id() -> String {
    rand::random::<u32>().to_string()
}

fn random_document_number() -> String {
    let mut rng = rand::thread_rng();
    (0..13)
        .map(|_| UDN_CHARS[rng.gen_range(0..UDN_CHARS.len())] as char)
        .collect()
}

/// A random duration in `[0, limit]`, or zero when the limit is not
/// positive.
fn random_offset_within(limit: Duration) -> Duration {
    if limit <= Duration::ZERO {
        return Duration::ZERO;
    }
    Delay {
        from: Duration::ZERO,
        to: limit,
    }
    .sample()
}

fn overridden_date(
    keyword: &str,
    current: Option<OffsetDateTime>,
) -> Result<Option<OffsetDateTime>> {
    match keyword {
        "" => Ok(current),
        EMPTY => Ok(None),
        MIDNIGHT => Ok(current.map(|t| t.replace_time(Time::MIDNIGHT))),
        other => Err(CoreError::configuration(format!(
            "unknown date keyword: {other}"
        ))),
    }
}

fn test_result(
    result: &TestResult,
    results_status: &str,
    collected: Option<OffsetDateTime>,
) -> ClinicalResult {
    let id = if result.id.is_empty() {
        &result.test_name
    } else {
        &result.id
    };
    let status = if result.result_status.is_empty() {
        results_status.to_string()
    } else {
        result.result_status.clone()
    };
    let observation_date_time = collected
        .map(|c| c + result.observation_date_time_offset.unwrap_or(Duration::ZERO));
    ClinicalResult {
        test_name: Some(CodedElement::new(id, &result.test_name)),
        value: result.value.clone(),
        unit: result.unit.clone(),
        abnormal_flag: result.abnormal_flag.clone(),
        reference_range: result.reference_range.clone(),
        observation_date_time,
        status,
        notes: result.notes.clone(),
        clinical_note: None,
    }
}
