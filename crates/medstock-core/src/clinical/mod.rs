//! Clinical records: patients, consultations, prescriptions and dispensing.

use chrono::NaiveDateTime;

use crate::access::{Action, Resource, SessionContext};
use crate::alerts::AlertThresholds;
use crate::clock::Clock;
use crate::db::Database;
use crate::error::{InventoryError, InventoryResult};
use crate::ledger::InventoryLedger;
use crate::models::{
    Consultation, Dispensation, NewPrescription, Patient, PatientQuery, Prescription,
    PrescriptionItem, PrescriptionStatus, StockChange,
};

/// Patient care workflow on top of the ledger.
pub struct ClinicalRecords<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
    thresholds: AlertThresholds,
}

impl<'a> ClinicalRecords<'a> {
    pub fn new(db: &'a Database, clock: &'a dyn Clock, thresholds: AlertThresholds) -> Self {
        Self {
            db,
            clock,
            thresholds,
        }
    }

    // ========================================================================
    // Patients
    // ========================================================================

    /// Register a patient. Name and a unique document number are required.
    pub fn create_patient(&self, ctx: &SessionContext, mut patient: Patient) -> InventoryResult<Patient> {
        ctx.require(Resource::Patients, Action::Create)?;
        patient.full_name = patient.full_name.trim().to_string();
        patient.document_number = patient.document_number.trim().to_string();
        validate_patient(&patient)?;

        if self.db.get_patient_by_document(&patient.document_number)?.is_some() {
            return Err(InventoryError::validation(
                "document_number",
                format!("{} is already registered", patient.document_number),
            ));
        }
        patient.active = true;
        self.db.insert_patient(&patient)?;

        tracing::info!(by = %ctx.username, id = %patient.id, "patient registered");
        Ok(patient)
    }

    pub fn update_patient(&self, ctx: &SessionContext, patient: &Patient) -> InventoryResult<()> {
        ctx.require(Resource::Patients, Action::Edit)?;
        validate_patient(patient)?;
        if let Some(holder) = self.db.get_patient_by_document(&patient.document_number)? {
            if holder.id != patient.id {
                return Err(InventoryError::validation(
                    "document_number",
                    format!("{} belongs to another patient", patient.document_number),
                ));
            }
        }
        if !self.db.update_patient(patient)? {
            return Err(InventoryError::NotFound(format!("patient {}", patient.id)));
        }
        tracing::info!(by = %ctx.username, id = %patient.id, "patient updated");
        Ok(())
    }

    pub fn get_patient(&self, ctx: &SessionContext, id: &str) -> InventoryResult<Patient> {
        ctx.require(Resource::Patients, Action::View)?;
        self.db
            .get_patient(id)?
            .ok_or_else(|| InventoryError::NotFound(format!("patient {}", id)))
    }

    /// Soft-delete a patient; their records stay attached.
    pub fn deactivate_patient(&self, ctx: &SessionContext, id: &str) -> InventoryResult<()> {
        ctx.require(Resource::Patients, Action::Delete)?;
        if !self.db.deactivate_patient(id)? {
            return Err(InventoryError::NotFound(format!("patient {}", id)));
        }
        tracing::info!(by = %ctx.username, %id, "patient deactivated");
        Ok(())
    }

    /// Search by name or document number, health plan and age bracket.
    pub fn search_patients(&self, ctx: &SessionContext, query: &PatientQuery) -> InventoryResult<Vec<Patient>> {
        ctx.require(Resource::Patients, Action::View)?;
        Ok(self.db.search_patients(query, self.clock.today())?)
    }

    // ========================================================================
    // Consultations
    // ========================================================================

    /// Schedule a consultation with the calling physician.
    pub fn schedule_consultation(
        &self,
        ctx: &SessionContext,
        patient_id: &str,
        scheduled_at: NaiveDateTime,
        reason: Option<String>,
    ) -> InventoryResult<Consultation> {
        ctx.require(Resource::Consultations, Action::Create)?;
        self.active_patient(patient_id)?;

        let mut consultation = Consultation::new(
            patient_id.to_string(),
            ctx.user_id.clone(),
            scheduled_at,
            self.clock.now(),
        );
        consultation.reason = reason;
        self.db.insert_consultation(&consultation)?;

        tracing::info!(by = %ctx.username, id = %consultation.id, %patient_id, "consultation scheduled");
        Ok(consultation)
    }

    /// Record findings and close a scheduled consultation.
    pub fn complete_consultation(
        &self,
        ctx: &SessionContext,
        id: &str,
        symptoms: Option<&str>,
        diagnosis: &str,
        notes: Option<&str>,
    ) -> InventoryResult<Consultation> {
        ctx.require(Resource::Consultations, Action::Edit)?;
        if diagnosis.trim().is_empty() {
            return Err(InventoryError::validation("diagnosis", "is required"));
        }
        let current = self.consultation(id)?;
        if !self
            .db
            .complete_consultation(id, symptoms, diagnosis.trim(), notes)?
        {
            return Err(InventoryError::validation(
                "status",
                format!("consultation is {:?}, not scheduled", current.status),
            ));
        }
        tracing::info!(by = %ctx.username, %id, "consultation completed");
        self.consultation(id)
    }

    pub fn cancel_consultation(&self, ctx: &SessionContext, id: &str) -> InventoryResult<()> {
        ctx.require(Resource::Consultations, Action::Edit)?;
        let current = self.consultation(id)?;
        if !self.db.cancel_consultation(id)? {
            return Err(InventoryError::validation(
                "status",
                format!("consultation is {:?}, not scheduled", current.status),
            ));
        }
        tracing::info!(by = %ctx.username, %id, "consultation cancelled");
        Ok(())
    }

    /// A patient's consultations, most recent first.
    pub fn list_consultations(&self, ctx: &SessionContext, patient_id: &str) -> InventoryResult<Vec<Consultation>> {
        ctx.require(Resource::Consultations, Action::View)?;
        Ok(self.db.list_consultations_for_patient(patient_id)?)
    }

    // ========================================================================
    // Prescriptions
    // ========================================================================

    /// Issue a prescription signed by the calling physician.
    pub fn issue_prescription(
        &self,
        ctx: &SessionContext,
        new_rx: NewPrescription,
    ) -> InventoryResult<Prescription> {
        ctx.require(Resource::Prescriptions, Action::Create)?;
        if new_rx.items.is_empty() {
            return Err(InventoryError::validation("items", "at least one item is required"));
        }
        self.active_patient(&new_rx.patient_id)?;
        if let Some(consultation_id) = &new_rx.consultation_id {
            self.consultation(consultation_id)?;
        }

        let rx_id = uuid::Uuid::new_v4().to_string();
        let mut items = Vec::with_capacity(new_rx.items.len());
        for item in new_rx.items {
            if item.quantity <= 0 {
                return Err(InventoryError::validation("quantity", "must be positive"));
            }
            match self.db.get_medication(&item.medication_id)? {
                Some(med) if med.active => {}
                _ => {
                    return Err(InventoryError::NotFound(format!(
                        "medication {}",
                        item.medication_id
                    )))
                }
            }
            items.push(PrescriptionItem {
                id: uuid::Uuid::new_v4().to_string(),
                prescription_id: rx_id.clone(),
                medication_id: item.medication_id,
                quantity: item.quantity,
                dosage_instructions: item.dosage_instructions,
                dispensed_quantity: 0,
            });
        }

        let rx = Prescription {
            id: rx_id,
            patient_id: new_rx.patient_id,
            physician_id: ctx.user_id.clone(),
            consultation_id: new_rx.consultation_id,
            issued_at: self.clock.now(),
            valid_until: new_rx.valid_until,
            status: PrescriptionStatus::Active,
            notes: new_rx.notes,
            items,
        };

        let tx = self.db.begin()?;
        self.db.insert_prescription(&rx)?;
        tx.commit()?;

        tracing::info!(by = %ctx.username, id = %rx.id, items = rx.items.len(), "prescription issued");
        Ok(rx)
    }

    /// Cancel an active prescription. Units already dispensed stay dispensed.
    pub fn cancel_prescription(&self, ctx: &SessionContext, id: &str) -> InventoryResult<()> {
        ctx.require(Resource::Prescriptions, Action::Edit)?;
        let rx = self.prescription(id)?;
        if rx.status != PrescriptionStatus::Active {
            return Err(InventoryError::validation(
                "status",
                format!("prescription is {:?}", rx.status),
            ));
        }
        self.db.set_prescription_status(id, PrescriptionStatus::Cancelled)?;
        tracing::info!(by = %ctx.username, %id, "prescription cancelled");
        Ok(())
    }

    pub fn get_prescription(&self, ctx: &SessionContext, id: &str) -> InventoryResult<Prescription> {
        ctx.require(Resource::Prescriptions, Action::View)?;
        self.prescription(id)
    }

    /// A patient's prescriptions, newest first.
    pub fn list_prescriptions(&self, ctx: &SessionContext, patient_id: &str) -> InventoryResult<Vec<Prescription>> {
        ctx.require(Resource::Prescriptions, Action::View)?;
        Ok(self.db.list_prescriptions_for_patient(patient_id)?)
    }

    /// Hand out `quantity` units of a lot against a prescription item.
    ///
    /// The dispensation and its Exit movement are written together; the
    /// prescription becomes Dispensed once every item is complete.
    pub fn dispense(
        &self,
        ctx: &SessionContext,
        item_id: &str,
        lot_id: &str,
        quantity: i64,
    ) -> InventoryResult<Dispensation> {
        ctx.require(Resource::Prescriptions, Action::Dispense)?;
        if quantity <= 0 {
            return Err(InventoryError::validation("quantity", "must be positive"));
        }
        let today = self.clock.today();

        let item = self
            .db
            .get_prescription_item(item_id)?
            .ok_or_else(|| InventoryError::NotFound(format!("prescription item {}", item_id)))?;
        let rx = self.prescription(&item.prescription_id)?;
        if rx.status != PrescriptionStatus::Active {
            return Err(InventoryError::validation(
                "prescription",
                format!("prescription is {:?}", rx.status),
            ));
        }
        if rx.valid_until.is_some_and(|until| until < today) {
            return Err(InventoryError::validation("prescription", "prescription has expired"));
        }

        let lot = self
            .db
            .get_lot(lot_id)?
            .filter(|lot| lot.active)
            .ok_or_else(|| InventoryError::NotFound(format!("lot {}", lot_id)))?;
        if lot.medication_id != item.medication_id {
            return Err(InventoryError::validation(
                "lot",
                "lot does not hold the prescribed medication",
            ));
        }
        if lot.is_expired(today) {
            return Err(InventoryError::validation(
                "lot",
                format!("lot {} expired on {}", lot.lot_number, lot.expires_on),
            ));
        }
        if quantity > item.remaining() {
            return Err(InventoryError::validation(
                "quantity",
                format!("{} exceeds the {} units left to dispense", quantity, item.remaining()),
            ));
        }

        let dispensation = Dispensation {
            id: uuid::Uuid::new_v4().to_string(),
            prescription_item_id: item.id.clone(),
            lot_id: lot.id.clone(),
            quantity,
            dispensed_by: Some(ctx.username.clone()),
            dispensed_at: self.clock.now(),
        };

        let ledger = InventoryLedger::new(self.db, self.clock, self.thresholds);
        let tx = self.db.begin()?;
        ledger.apply_change(
            lot_id,
            StockChange::Exit,
            quantity,
            Some(format!("Dispensed for prescription {}", rx.id)),
            &ctx.username,
        )?;
        self.db.insert_dispensation(&dispensation)?;
        let fully_dispensed = self.prescription(&rx.id)?.is_fully_dispensed();
        if fully_dispensed {
            self.db
                .set_prescription_status(&rx.id, PrescriptionStatus::Dispensed)?;
        }
        tx.commit()?;

        tracing::info!(
            by = %ctx.username,
            prescription = %rx.id,
            %item_id,
            %lot_id,
            quantity,
            fully_dispensed,
            "dispensed"
        );
        Ok(dispensation)
    }

    fn active_patient(&self, id: &str) -> InventoryResult<Patient> {
        self.db
            .get_patient(id)?
            .filter(|p| p.active)
            .ok_or_else(|| InventoryError::NotFound(format!("patient {}", id)))
    }

    fn consultation(&self, id: &str) -> InventoryResult<Consultation> {
        self.db
            .get_consultation(id)?
            .ok_or_else(|| InventoryError::NotFound(format!("consultation {}", id)))
    }

    fn prescription(&self, id: &str) -> InventoryResult<Prescription> {
        self.db
            .get_prescription(id)?
            .ok_or_else(|| InventoryError::NotFound(format!("prescription {}", id)))
    }
}

fn validate_patient(patient: &Patient) -> InventoryResult<()> {
    if patient.full_name.trim().is_empty() {
        return Err(InventoryError::validation("full_name", "is required"));
    }
    if patient.document_number.trim().is_empty() {
        return Err(InventoryError::validation("document_number", "is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::{
        AgeBracket, ConsultationStatus, Medication, NewLot, NewPrescriptionItem, Role,
        StorageLocation, User,
    };
    use chrono::{Duration, NaiveDate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 15).unwrap()
    }

    struct Fixture {
        db: Database,
        clock: FixedClock,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                db: Database::open_in_memory().unwrap(),
                clock: FixedClock::at_date(today()),
            }
        }

        fn records(&self) -> ClinicalRecords<'_> {
            ClinicalRecords::new(&self.db, &self.clock, AlertThresholds::default())
        }

        fn session(&self, username: &str, role: Role) -> SessionContext {
            let user = User::new(username.into(), "x".into(), username.into(), role, self.clock.now());
            self.db.insert_user(&user).unwrap();
            SessionContext::new(user.id, user.username, user.full_name, role)
        }

        fn medication(&self, name: &str) -> Medication {
            let med = Medication::new(name.into(), self.clock.now());
            self.db.insert_medication(&med).unwrap();
            med
        }

        fn lot(&self, med: &Medication, quantity: i64, expires_on: NaiveDate) -> String {
            let lot = NewLot::new(
                med.id.clone(),
                "L1",
                expires_on,
                quantity,
                StorageLocation::new("Central Pharmacy"),
            )
            .into_lot(None, self.clock.now());
            self.db.insert_lot(&lot).unwrap();
            lot.id
        }
    }

    fn patient(name: &str, doc: &str) -> Patient {
        Patient::new(
            name.into(),
            doc.into(),
            today().and_hms_opt(8, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_patient_registration_and_search() {
        let f = Fixture::new();
        let records = f.records();
        let doctor = f.session("house", Role::Physician);

        let mut child = patient("Lia Souza", "111");
        child.birth_date = NaiveDate::from_ymd_opt(2018, 1, 1);
        child.health_plan = Some("Unimed".into());
        records.create_patient(&doctor, child).unwrap();

        let mut senior = patient("Jose Souza", "222");
        senior.birth_date = NaiveDate::from_ymd_opt(1950, 1, 1);
        records.create_patient(&doctor, senior).unwrap();

        let duplicate = records.create_patient(&doctor, patient("Other", "111"));
        assert!(matches!(duplicate, Err(InventoryError::Validation { .. })));

        let souzas = PatientQuery {
            text: Some("souza".into()),
            ..Default::default()
        };
        assert_eq!(records.search_patients(&doctor, &souzas).unwrap().len(), 2);

        let seniors = PatientQuery {
            age_bracket: Some(AgeBracket::Senior),
            ..Default::default()
        };
        let found = records.search_patients(&doctor, &seniors).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].document_number, "222");
    }

    #[test]
    fn test_nurse_edits_but_cannot_create_patients() {
        let f = Fixture::new();
        let records = f.records();
        let doctor = f.session("house", Role::Physician);
        let nurse = f.session("joana", Role::Nurse);

        assert!(matches!(
            records.create_patient(&nurse, patient("A", "1")),
            Err(InventoryError::Access(_))
        ));
        let mut p = records.create_patient(&doctor, patient("A", "1")).unwrap();
        p.phone = Some("555-0100".into());
        records.update_patient(&nurse, &p).unwrap();
        assert_eq!(
            records.get_patient(&nurse, &p.id).unwrap().phone.as_deref(),
            Some("555-0100")
        );
    }

    #[test]
    fn test_consultation_lifecycle() {
        let f = Fixture::new();
        let records = f.records();
        let doctor = f.session("house", Role::Physician);
        let p = records.create_patient(&doctor, patient("A", "1")).unwrap();

        let at = today().and_hms_opt(14, 0, 0).unwrap();
        let c = records
            .schedule_consultation(&doctor, &p.id, at, Some("Headache".into()))
            .unwrap();
        assert_eq!(c.physician_id, doctor.user_id);

        let done = records
            .complete_consultation(&doctor, &c.id, Some("fever"), "Influenza", None)
            .unwrap();
        assert_eq!(done.status, ConsultationStatus::Completed);
        assert_eq!(done.diagnosis.as_deref(), Some("Influenza"));

        assert!(records.cancel_consultation(&doctor, &c.id).is_err());
        assert_eq!(records.list_consultations(&doctor, &p.id).unwrap().len(), 1);
    }

    #[test]
    fn test_prescription_requires_items() {
        let f = Fixture::new();
        let records = f.records();
        let doctor = f.session("house", Role::Physician);
        let p = records.create_patient(&doctor, patient("A", "1")).unwrap();
        let med = f.medication("Amoxicillin");

        let empty = NewPrescription {
            patient_id: p.id.clone(),
            consultation_id: None,
            valid_until: None,
            notes: None,
            items: vec![],
        };
        assert!(matches!(
            records.issue_prescription(&doctor, empty),
            Err(InventoryError::Validation { .. })
        ));

        let zero = NewPrescription {
            patient_id: p.id.clone(),
            consultation_id: None,
            valid_until: None,
            notes: None,
            items: vec![NewPrescriptionItem {
                medication_id: med.id.clone(),
                quantity: 0,
                dosage_instructions: None,
            }],
        };
        assert!(records.issue_prescription(&doctor, zero).is_err());
        assert!(records.list_prescriptions(&doctor, &p.id).unwrap().is_empty());
    }

    #[test]
    fn test_dispense_flow() {
        let f = Fixture::new();
        let records = f.records();
        let doctor = f.session("house", Role::Physician);
        let pharmacist = f.session("ana", Role::Pharmacist);
        let p = records.create_patient(&doctor, patient("A", "1")).unwrap();
        let amox = f.medication("Amoxicillin");
        let other = f.medication("Dipyrone");
        let lot_id = f.lot(&amox, 50, today() + Duration::days(200));
        let expired = f.lot(&amox, 50, today() - Duration::days(1));
        let wrong = f.lot(&other, 50, today() + Duration::days(200));

        let rx = records
            .issue_prescription(
                &doctor,
                NewPrescription {
                    patient_id: p.id.clone(),
                    consultation_id: None,
                    valid_until: None,
                    notes: None,
                    items: vec![NewPrescriptionItem {
                        medication_id: amox.id.clone(),
                        quantity: 21,
                        dosage_instructions: Some("1 capsule every 8h".into()),
                    }],
                },
            )
            .unwrap();
        let item_id = rx.items[0].id.clone();

        // Physicians prescribe but do not dispense
        assert!(matches!(
            records.dispense(&doctor, &item_id, &lot_id, 1),
            Err(InventoryError::Access(_))
        ));
        assert!(records.dispense(&pharmacist, &item_id, &expired, 1).is_err());
        assert!(records.dispense(&pharmacist, &item_id, &wrong, 1).is_err());
        assert!(records.dispense(&pharmacist, &item_id, &lot_id, 22).is_err());

        records.dispense(&pharmacist, &item_id, &lot_id, 14).unwrap();
        let partial = records.get_prescription(&pharmacist, &rx.id).unwrap();
        assert_eq!(partial.status, PrescriptionStatus::Active);
        assert_eq!(partial.items[0].dispensed_quantity, 14);

        records.dispense(&pharmacist, &item_id, &lot_id, 7).unwrap();
        let done = records.get_prescription(&pharmacist, &rx.id).unwrap();
        assert_eq!(done.status, PrescriptionStatus::Dispensed);

        assert_eq!(f.db.get_lot(&lot_id).unwrap().unwrap().current_quantity, 29);
        assert_eq!(f.db.list_movements_for_lot(&lot_id).unwrap().len(), 2);
        assert!(records.dispense(&pharmacist, &item_id, &lot_id, 1).is_err());
    }

    #[test]
    fn test_failed_dispense_leaves_no_trace() {
        let f = Fixture::new();
        let records = f.records();
        let doctor = f.session("house", Role::Physician);
        let pharmacist = f.session("ana", Role::Pharmacist);
        let p = records.create_patient(&doctor, patient("A", "1")).unwrap();
        let med = f.medication("Amoxicillin");
        let lot_id = f.lot(&med, 5, today() + Duration::days(200));

        let rx = records
            .issue_prescription(
                &doctor,
                NewPrescription {
                    patient_id: p.id,
                    consultation_id: None,
                    valid_until: None,
                    notes: None,
                    items: vec![NewPrescriptionItem {
                        medication_id: med.id,
                        quantity: 10,
                        dosage_instructions: None,
                    }],
                },
            )
            .unwrap();

        let err = records
            .dispense(&pharmacist, &rx.items[0].id, &lot_id, 8)
            .unwrap_err();
        assert!(matches!(err, InventoryError::InsufficientStock { .. }));
        assert!(f.db.list_dispensations_for_item(&rx.items[0].id).unwrap().is_empty());
        assert_eq!(f.db.get_lot(&lot_id).unwrap().unwrap().current_quantity, 5);
    }

    #[test]
    fn test_cancelled_prescription_cannot_be_dispensed() {
        let f = Fixture::new();
        let records = f.records();
        let doctor = f.session("house", Role::Physician);
        let pharmacist = f.session("ana", Role::Pharmacist);
        let p = records.create_patient(&doctor, patient("A", "1")).unwrap();
        let med = f.medication("Amoxicillin");
        let lot_id = f.lot(&med, 5, today() + Duration::days(200));

        let rx = records
            .issue_prescription(
                &doctor,
                NewPrescription {
                    patient_id: p.id,
                    consultation_id: None,
                    valid_until: None,
                    notes: None,
                    items: vec![NewPrescriptionItem {
                        medication_id: med.id,
                        quantity: 2,
                        dosage_instructions: None,
                    }],
                },
            )
            .unwrap();
        records.cancel_prescription(&doctor, &rx.id).unwrap();
        assert!(records
            .dispense(&pharmacist, &rx.items[0].id, &lot_id, 1)
            .is_err());
    }
}
