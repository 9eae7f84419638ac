//! Patient care flow through the FFI facade: consultation, prescription and
//! dispensing against a lot.

use std::sync::Arc;

use chrono::NaiveDate;

use medstock_core::{
    Config, Database, FfiMedicationInput, FfiNewLot, FfiNewPrescription, FfiNewPrescriptionItem,
    FfiPatientInput, FfiSession, FfiStockFilter, FfiStorageLocation, FixedClock, MedStockCore,
    MedStockError,
};

struct Ward {
    core: MedStockCore,
    admin: FfiSession,
    physician: FfiSession,
    pharmacist: FfiSession,
    nurse: FfiSession,
}

impl Ward {
    fn new() -> Self {
        let core = MedStockCore::with_clock(
            Database::open_in_memory().unwrap(),
            Config::default(),
            Arc::new(FixedClock::at_date(NaiveDate::from_ymd_opt(2024, 7, 10).unwrap())),
        )
        .unwrap();
        let admin = core.login("admin".into(), "admin123".into()).unwrap();

        let mut sessions = Vec::new();
        for (username, role) in [("drsilva", "physician"), ("ana", "pharmacist"), ("rita", "nurse")] {
            core.create_user(
                admin.clone(),
                username.into(),
                "pw".into(),
                username.into(),
                None,
                role.into(),
            )
            .unwrap();
            sessions.push(core.login(username.into(), "pw".into()).unwrap());
        }
        let mut sessions = sessions.into_iter();

        Self {
            physician: sessions.next().unwrap(),
            pharmacist: sessions.next().unwrap(),
            nurse: sessions.next().unwrap(),
            admin,
            core,
        }
    }
}

fn patient(name: &str, document: &str) -> FfiPatientInput {
    FfiPatientInput {
        full_name: name.into(),
        document_number: document.into(),
        birth_date: Some("1958-02-14".into()),
        sex: Some("F".into()),
        phone: None,
        email: None,
        city: Some("Recife".into()),
        health_plan: Some("SUS".into()),
        allergies: Some("penicillin".into()),
        continuous_medications: None,
        notes: None,
    }
}

fn medication(name: &str) -> FfiMedicationInput {
    FfiMedicationInput {
        name: name.into(),
        active_ingredient: Some("losartan potassium".into()),
        concentration: Some("50mg".into()),
        dosage_form: Some("tablet".into()),
        route: Some("oral".into()),
        manufacturer: None,
        category: Some("Antihypertensive".into()),
        barcode: None,
        controlled: false,
        refrigerated: false,
        prescription_required: true,
        notes: None,
    }
}

#[test]
fn test_prescription_is_dispensed_from_a_lot() {
    let ward = Ward::new();
    let core = &ward.core;

    let med = core
        .create_medication(ward.pharmacist.clone(), medication("Losartan 50mg"))
        .unwrap();
    let lot = core
        .register_lot(
            ward.pharmacist.clone(),
            FfiNewLot {
                medication_id: med.id.clone(),
                lot_number: "LOS-77".into(),
                manufactured_on: Some("2024-01-05".into()),
                expires_on: "2025-12-31".into(),
                quantity: 60,
                unit_price: None,
                supplier: Some("Medley".into()),
                location: FfiStorageLocation {
                    site: "Central Pharmacy".into(),
                    sector: Some("A".into()),
                    shelf: None,
                    slot: None,
                },
                notes: None,
            },
        )
        .unwrap();

    let maria = core
        .create_patient(ward.physician.clone(), patient("Maria Souza", "123.456.789-00"))
        .unwrap();
    let consultation = core
        .schedule_consultation(
            ward.physician.clone(),
            maria.id.clone(),
            "2024-07-10 09:30".into(),
            Some("Follow-up".into()),
        )
        .unwrap();
    assert_eq!(consultation.physician_id, ward.physician.user_id);
    let consultation = core
        .complete_consultation(
            ward.physician.clone(),
            consultation.id,
            None,
            "Essential hypertension".into(),
            None,
        )
        .unwrap();
    assert_eq!(consultation.status, "Completed");

    let rx = core
        .issue_prescription(
            ward.physician.clone(),
            FfiNewPrescription {
                patient_id: maria.id.clone(),
                consultation_id: Some(consultation.id.clone()),
                valid_until: Some("2024-08-10".into()),
                notes: None,
                items: vec![FfiNewPrescriptionItem {
                    medication_id: med.id.clone(),
                    quantity: 30,
                    dosage_instructions: Some("1 tablet daily".into()),
                }],
            },
        )
        .unwrap();
    let item_id = rx.items[0].id.clone();

    // Dispensing is a pharmacist task
    for session in [ward.nurse.clone(), ward.physician.clone()] {
        assert!(matches!(
            core.dispense(session, item_id.clone(), lot.id.clone(), 10),
            Err(MedStockError::PermissionDenied(_))
        ));
    }

    core.dispense(ward.pharmacist.clone(), item_id.clone(), lot.id.clone(), 20)
        .unwrap();
    let partial = core.get_prescription(ward.nurse.clone(), rx.id.clone()).unwrap();
    assert_eq!(partial.status, "Active");
    assert_eq!(partial.items[0].remaining, 10);

    // More than the item still allows
    assert!(matches!(
        core.dispense(ward.pharmacist.clone(), item_id.clone(), lot.id.clone(), 11),
        Err(MedStockError::InvalidInput(_))
    ));

    let last = core
        .dispense(ward.pharmacist.clone(), item_id, lot.id.clone(), 10)
        .unwrap();
    assert_eq!(last.dispensed_by.as_deref(), Some("ana"));
    let done = core.get_prescription(ward.pharmacist.clone(), rx.id).unwrap();
    assert_eq!(done.status, "Dispensed");

    // Two exits came out of the lot
    let audit = core.audit_lot(ward.pharmacist.clone(), lot.id.clone()).unwrap();
    assert_eq!(audit.stored_quantity, 30);
    assert_eq!(audit.movement_count, 3);
    assert!(audit.consistent);

    let exits = core
        .movement_history(
            ward.admin.clone(),
            "2024-07-01".into(),
            "2024-07-31".into(),
            Some("exit".into()),
            None,
        )
        .unwrap();
    assert_eq!(exits.len(), 2);
    assert!(exits.iter().all(|e| e.lot_number == "LOS-77"));

    let rows = core
        .stock_view(
            ward.nurse.clone(),
            FfiStockFilter {
                search_term: Some("losartan".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity, 30);
    assert_eq!(rows[0].status, "normal");
}

#[test]
fn test_patient_search_and_duplicates() {
    let ward = Ward::new();
    let core = &ward.core;

    core.create_patient(ward.physician.clone(), patient("Maria Souza", "111"))
        .unwrap();
    let mut young = patient("Joao Lima", "222");
    young.birth_date = Some("2015-03-01".into());
    young.health_plan = Some("Unimed".into());
    core.create_patient(ward.physician.clone(), young).unwrap();

    assert!(matches!(
        core.create_patient(ward.physician.clone(), patient("Other Maria", "111")),
        Err(MedStockError::InvalidInput(_))
    ));

    let seniors = core
        .search_patients(ward.nurse.clone(), None, None, Some("senior".into()), false)
        .unwrap();
    assert_eq!(seniors.len(), 1);
    assert_eq!(seniors[0].full_name, "Maria Souza");

    let unimed = core
        .search_patients(ward.nurse.clone(), None, Some("Unimed".into()), None, false)
        .unwrap();
    assert_eq!(unimed.len(), 1);
    assert_eq!(unimed[0].document_number, "222");

    assert!(matches!(
        core.search_patients(ward.nurse.clone(), None, None, Some("elderly".into()), false),
        Err(MedStockError::InvalidInput(_))
    ));

    // Nurses cannot register patients
    assert!(matches!(
        core.create_patient(ward.nurse.clone(), patient("New", "333")),
        Err(MedStockError::PermissionDenied(_))
    ));
}

#[test]
fn test_disabled_account_session_is_rejected() {
    let ward = Ward::new();
    let core = &ward.core;

    core.set_user_active(ward.admin.clone(), ward.nurse.user_id.clone(), false)
        .unwrap();
    assert!(matches!(
        core.list_medications(ward.nurse.clone()),
        Err(MedStockError::AuthenticationFailed(_))
    ));
    assert!(matches!(
        core.login("rita".into(), "pw".into()),
        Err(MedStockError::AuthenticationFailed(_))
    ));
}
