use chrono::{DateTime, TimeZone, Utc};
use param_values::backend::{BackendError, ValueBackend};
use param_values::derive::{DerivationRule, DerivedValues, TriggerValue};
use param_values::wire::{SaveRecord, ValueQuery, ValueRecord, decode_records};
use param_values::backend::FileBackend;
use param_values::{
    EditingSession, EngineConfig, RawValue, RuleError, RuleRegistry, SaveError, StoreError,
    ValueKind, resolve_kind,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::cell::{Cell, RefCell};

/// In-memory value store that can be told to fail.
#[derive(Default)]
struct MemoryBackend {
    records: RefCell<Vec<ValueRecord>>,
    saved: RefCell<Vec<Vec<SaveRecord>>>,
    down: Cell<bool>,
}

impl MemoryBackend {
    fn with(body: Value) -> Self {
        let backend = Self::default();
        *backend.records.borrow_mut() = decode_records(body).unwrap();
        backend
    }

    fn unreachable(&self) -> BackendError {
        BackendError::Transport {
            url: "memory://values".to_string(),
            message: "connection refused".to_string(),
        }
    }
}

impl ValueBackend for MemoryBackend {
    fn load(&self, _query: &ValueQuery) -> Result<Vec<ValueRecord>, BackendError> {
        if self.down.get() {
            return Err(self.unreachable());
        }
        Ok(self.records.borrow().clone())
    }

    fn save(&self, records: &[SaveRecord]) -> Result<(), BackendError> {
        if self.down.get() {
            return Err(self.unreachable());
        }
        self.saved.borrow_mut().push(records.to_vec());
        Ok(())
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

fn open(backend: &impl ValueBackend) -> EditingSession {
    EditingSession::load(backend, ValueQuery::default(), EngineConfig::default()).unwrap()
}

fn number(id: &str, code: &str, employee: &str) -> Value {
    json!({
        "id": id,
        "parameterId": format!("p-{code}"),
        "parameterCode": code,
        "dataTypeDescription": "Numérico",
        "employeeId": employee,
    })
}

fn labor_snapshot() -> Value {
    let codes = EngineConfig::default().labor_rates;
    json!([
        // Targets first: locking must not depend on record order.
        number("t1", &codes.ordinary_day, "e1"),
        number("t2", &codes.ordinary_night, "e1"),
        number("t3", &codes.extra_day, "e1"),
        number("t4", &codes.extra_night, "e1"),
        number("t5", &codes.transport_allowance, "e1"),
        number("s1", &codes.trigger, "e1"),
        number("s2", &codes.trigger, "e2"),
        number("t6", &codes.ordinary_day, "e2"),
        number("t7", &codes.holiday_extra_night, "e1"),
    ])
}

fn numbers(session: &EditingSession, ids: &[&str]) -> Vec<Option<f64>> {
    ids.iter()
        .map(|id| match session.store().value(id) {
            Some(RawValue::Number(n)) => *n,
            other => panic!("{id}: {other:?}"),
        })
        .collect()
}

#[test]
fn declared_types_resolve_by_fragment() {
    assert_eq!(resolve_kind("NUMÉRICO"), ValueKind::Number);
    assert_eq!(resolve_kind("Valor numerico"), ValueKind::Number);
    assert_eq!(resolve_kind("Correo electrónico"), ValueKind::Email);
    assert_eq!(resolve_kind("Hora de entrada"), ValueKind::Time);
    assert_eq!(resolve_kind("Fecha"), ValueKind::Date);
    assert_eq!(resolve_kind("Lista de opciones"), ValueKind::List);
    assert_eq!(resolve_kind("Booleano"), ValueKind::Text);
}

#[test]
fn salary_derives_labor_rates_in_its_own_scope() {
    let backend = MemoryBackend::with(labor_snapshot());
    let mut session = open(&backend);

    session.set_input("s1", "1000000").unwrap();

    assert_eq!(
        numbers(&session, &["t1", "t2", "t3", "t4", "t5", "t7"]),
        vec![
            Some(4348.0),
            Some(5870.0),
            Some(5435.0),
            Some(7609.0),
            Some(140_500.0),
            Some(10_870.0),
        ]
    );
    assert_eq!(numbers(&session, &["t6"]), vec![None]);
}

#[test]
fn same_trigger_twice_gives_same_targets() {
    let backend = MemoryBackend::with(labor_snapshot());
    let mut session = open(&backend);
    let ids = ["t1", "t2", "t3", "t4", "t5", "t7"];

    session.set_input("s1", "3000000").unwrap();
    let first = numbers(&session, &ids);
    session.set_input("s1", "3000000").unwrap();
    assert_eq!(numbers(&session, &ids), first);
    // Above two minimum wages no transport allowance is paid.
    assert_eq!(numbers(&session, &["t5"]), vec![Some(0.0)]);
}

#[test]
fn targets_are_never_user_editable() {
    let backend = MemoryBackend::with(labor_snapshot());
    let mut session = open(&backend);

    for id in ["t1", "t5", "t6", "t7"] {
        assert!(!session.get(id).unwrap().editable, "{id}");
        assert!(matches!(session.set_input(id, "1"), Err(StoreError::ReadOnly { .. })));
    }
    assert!(session.get("s1").unwrap().editable);

    // Still locked after the engine writes them.
    session.set_input("s2", "1000000").unwrap();
    assert!(!session.get("t6").unwrap().editable);
    assert!(session.get("t6").unwrap().derived);
}

#[test]
fn risk_class_sets_insurance_rate() {
    let risk = EngineConfig::default().risk;
    let backend = MemoryBackend::with(json!([
        {"id": "r1", "parameterCode": risk.trigger, "dataTypeDescription": "Texto",
         "employeeId": "e1"},
        {"id": "p1", "parameterCode": risk.target, "dataTypeDescription": "Numérico",
         "employeeId": "e1"},
    ]));
    let mut session = open(&backend);

    for (input, rate) in [("III", 2.436), ("3", 2.436), ("2", 1.044)] {
        session.set_input("r1", input).unwrap();
        assert_eq!(
            session.store().value("p1"),
            Some(&RawValue::Number(Some(rate))),
            "{input}"
        );
    }

    session.set_input("r1", "VII").unwrap();
    assert_eq!(session.store().value("p1"), Some(&RawValue::Number(Some(1.044))));
}

#[test]
fn list_risk_class_reads_the_selected_label() {
    let risk = EngineConfig::default().risk;
    let catalog = r#"[{"Id":"10","Valor":"Clase I"},{"Id":"40","Valor":"Clase IV"}]"#;
    let backend = MemoryBackend::with(json!([
        {"id": "r1", "parameterCode": risk.trigger, "dataTypeDescription": "Lista",
         "listDefinition": catalog, "employeeId": "e1"},
        {"id": "p1", "parameterCode": risk.target, "dataTypeDescription": "Numérico",
         "employeeId": "e1"},
    ]));
    let mut session = open(&backend);

    session.set_input("r1", "40").unwrap();
    assert_eq!(session.store().value("p1"), Some(&RawValue::Number(Some(4.350))));
}

#[test]
fn email_falls_back_to_text_slot() {
    let backend = MemoryBackend::with(json!([{
        "id": "m1", "parameterCode": "CORREO", "dataTypeDescription": "Correo",
        "textValue": "x@y.com", "emailValue": ""
    }]));
    let session = open(&backend);
    assert_eq!(
        session.store().value("m1"),
        Some(&RawValue::Email("x@y.com".to_string()))
    );
}

#[test]
fn list_selection_saves_label_and_numeric_id() {
    let backend = MemoryBackend::with(json!([{
        "id": "l1", "parameterId": "p9", "parameterCode": "TURNO", "dataTypeDescription": "Lista",
        "listDefinition": r#"[{"Id":"1","Valor":"A"},{"Id":"2","Valor":"B"}]"#,
        "employeeId": "e1"
    }]));
    let mut session = open(&backend);

    session.set_input("l1", "2").unwrap();
    assert_eq!(session.save(&backend, now()).unwrap(), 1);

    let saved = backend.saved.borrow();
    assert_eq!(
        saved[0],
        vec![SaveRecord {
            id: "l1".to_string(),
            parameter_id: "p9".to_string(),
            employee_id: Some("e1".to_string()),
            client_id: None,
            text_value: "B".to_string(),
            numeric_value: 2.0,
            date_value: "2025-03-01T12:00:00.000Z".to_string(),
            hour_value: String::new(),
        }]
    );
}

#[test]
fn invalid_field_blocks_the_whole_save() {
    let backend = MemoryBackend::with(json!([
        number("a", "A", "e1"),
        {"id": "m", "parameterCode": "CORREO", "dataTypeDescription": "Email", "employeeId": "e1"},
    ]));
    let mut session = open(&backend);

    session.set_input("a", "12").unwrap();
    assert!(session.set_input("m", "not-an-email").is_err());

    match session.save(&backend, now()) {
        Err(SaveError::Invalid(issues)) => {
            assert_eq!(issues.len(), 1);
            assert_eq!(issues[0].value_id, "m");
            assert_eq!(issues[0].input, "not-an-email");
        }
        other => panic!("expected invalid save, got {other:?}"),
    }
    assert!(backend.saved.borrow().is_empty());
    assert_eq!(session.store().value("a"), Some(&RawValue::Number(Some(12.0))));
}

#[test]
fn failed_save_and_reload_keep_the_session() {
    let backend = MemoryBackend::with(labor_snapshot());
    let mut session = open(&backend);
    session.set_input("s1", "1000000").unwrap();
    let before = numbers(&session, &["s1", "t1", "t5"]);

    backend.down.set(true);
    assert!(matches!(session.save(&backend, now()), Err(SaveError::Backend(_))));
    assert!(session.reload(&backend).is_err());
    assert_eq!(numbers(&session, &["s1", "t1", "t5"]), before);

    backend.down.set(false);
    session.reload(&backend).unwrap();
    assert_eq!(numbers(&session, &["s1", "t1"]), vec![None, None]);
    assert!(!session.get("t1").unwrap().editable);
}

#[test]
fn query_filters_are_reapplied_locally() {
    let backend = MemoryBackend::with(labor_snapshot());
    let query = ValueQuery {
        code: Some(" salario ".to_string()),
        employee_id: Some("e2".to_string()),
        client_id: None,
    };
    let session = EditingSession::load(&backend, query, EngineConfig::default()).unwrap();
    let ids: Vec<&str> = session.store().entries().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["s2"]);
}

#[test]
fn recompute_on_load_overwrites_stored_targets() {
    let codes = EngineConfig::default().labor_rates;
    let mut salary = number("s1", &codes.trigger, "e1");
    salary["numericValue"] = json!(1_000_000);
    let mut stale = number("t1", &codes.ordinary_day, "e1");
    stale["numericValue"] = json!(1);
    let backend = MemoryBackend::with(json!([salary, stale]));

    let session = open(&backend);
    assert_eq!(numbers(&session, &["t1"]), vec![Some(1.0)]);

    let config = EngineConfig {
        recompute_on_load: true,
        ..Default::default()
    };
    let session = EditingSession::load(&backend, ValueQuery::default(), config).unwrap();
    assert_eq!(numbers(&session, &["t1"]), vec![Some(4348.0)]);
}

#[test]
fn chained_rules_are_rejected_at_registration() {
    let rule = |name: &str, trigger: &str, target: &str| {
        DerivationRule::new(
            name,
            trigger.to_string(),
            vec![target.to_string()],
            Box::new(|_: &TriggerValue<'_>| Some(DerivedValues::new())),
        )
    };

    let mut registry = RuleRegistry::new();
    registry.register(rule("a", "X", "Y")).unwrap();
    assert!(matches!(
        registry.register(rule("b", "Y", "Z")),
        Err(RuleError::TargetIsTrigger { .. })
    ));
}

#[test]
fn non_positive_salary_leaves_targets_untouched() {
    let backend = MemoryBackend::with(labor_snapshot());
    let mut session = open(&backend);

    session.set_input("s1", "1000000").unwrap();
    for input in ["0", "-5", ""] {
        session.set_input("s1", input).unwrap();
        assert_eq!(
            numbers(&session, &["t1", "t5", "t7"]),
            vec![Some(4348.0), Some(140_500.0), Some(10_870.0)],
            "{input:?}"
        );
    }
}

#[test]
fn file_save_refuses_to_overwrite_the_export() {
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("values.json");
    std::fs::write(&export, labor_snapshot().to_string()).unwrap();

    let backend = FileBackend::new(&export);
    let mut session = open(&backend);
    session.set_input("s1", "2000000").unwrap();

    assert!(matches!(
        session.save(&backend, now()),
        Err(SaveError::Backend(BackendError::Config(_)))
    ));

    session.reload(&backend).unwrap();
    let target = session.get("t1").unwrap();
    assert_eq!(target.code(), EngineConfig::default().labor_rates.ordinary_day);
    assert_eq!(target.kind(), ValueKind::Number);
    assert!(!target.editable);
    assert_eq!(session.get("s1").unwrap().kind(), ValueKind::Number);
}

#[test]
fn file_save_writes_payload_beside_the_export() {
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("values.json");
    let out = dir.path().join("payload.json");
    std::fs::write(&export, labor_snapshot().to_string()).unwrap();

    let backend = FileBackend::new(&export).with_output(&out);
    let mut session = open(&backend);
    session.set_input("s1", "1000000").unwrap();
    assert_eq!(session.save(&backend, now()).unwrap(), 9);

    let payload: Vec<SaveRecord> =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    let t1 = payload.iter().find(|r| r.id == "t1").unwrap();
    assert_eq!(t1.numeric_value, 4348.0);

    session.reload(&backend).unwrap();
    assert!(!session.get("t1").unwrap().editable);
    assert_eq!(numbers(&session, &["s1", "t1"]), vec![None, None]);
}
