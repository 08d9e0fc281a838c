use super::*;

fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

fn template(id: &str, active: bool) -> PromptTemplate {
    PromptTemplate {
        id: id.into(),
        name: format!("nome {id}"),
        description: String::new(),
        body: format!("corpo {id} {{titulo}}"),
        active,
    }
}

fn store_in(dir: &tempfile::TempDir) -> PromptStore {
    PromptStore::new(dir.path().join("config").join("prompts.json"))
}

// =============================================================================
// substitute
// =============================================================================

#[test]
fn substitute_replaces_every_occurrence() {
    let out = substitute("{a}-{b}-{a}", &vars(&[("a", "1"), ("b", "2")]));
    assert_eq!(out, "1-2-1");
}

#[test]
fn substitute_leaves_unknown_placeholders() {
    let out = substitute("Olá {nome}, obra {obra}", &vars(&[("nome", "Ana")]));
    assert_eq!(out, "Olá Ana, obra {obra}");
}

#[test]
fn substitute_is_case_sensitive() {
    let out = substitute("{Titulo} {titulo}", &vars(&[("titulo", "x")]));
    assert_eq!(out, "{Titulo} x");
}

#[test]
fn substitute_keeps_json_braces_intact() {
    let body = "{\n  \"KM_INICIO\": \"valor\"\n}\n{titulo}";
    let out = substitute(body, &vars(&[("titulo", "Duplicação X")]));
    assert_eq!(out, "{\n  \"KM_INICIO\": \"valor\"\n}\nDuplicação X");
}

#[test]
fn substitute_does_not_rescan_values() {
    let out = substitute("{a}", &vars(&[("a", "{b}"), ("b", "nope")]));
    assert_eq!(out, "{b}");
}

#[test]
fn substitute_handles_nested_and_unbalanced_braces() {
    let v = vars(&[("a", "x")]);
    assert_eq!(substitute("{{a}}", &v), "{x}");
    assert_eq!(substitute("{a", &v), "{a");
    assert_eq!(substitute("a}", &v), "a}");
    assert_eq!(substitute("{}", &v), "{}");
}

#[test]
fn substitute_leaves_no_known_placeholder_behind() {
    let keys = ["titulo", "tipoObra", "localizacao", "descricao", "arquivosInfo"];
    let v: BTreeMap<String, String> = keys
        .iter()
        .enumerate()
        .map(|(i, k)| ((*k).to_string(), format!("valor {i}")))
        .collect();

    for rotation in 0..keys.len() {
        let mut order = keys.to_vec();
        order.rotate_left(rotation);
        let template: String = order.iter().map(|k| format!("[{{{k}}}] {{{k}}} ")).collect();
        let out = substitute(&template, &v);
        for k in keys {
            assert!(!out.contains(&format!("{{{k}}}")), "left {k} in {out}");
        }
    }
}

#[test]
fn substitute_is_idempotent_without_new_keys() {
    let v = vars(&[("titulo", "T"), ("descricao", "D")]);
    for template in ["{titulo} {x} {descricao}", "{{titulo}}", "sem placeholders", "{y}{titulo}{z}"] {
        let once = substitute(template, &v);
        assert_eq!(substitute(&once, &v), once);
    }
}

// =============================================================================
// load / active
// =============================================================================

#[test]
fn missing_store_yields_default_template() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let all = store.load_all();
    assert_eq!(all, vec![default_template()]);

    let active = store.get_active();
    assert!(active.active);
    assert_eq!(active.id, DEFAULT_TEMPLATE_ID);
}

#[test]
fn malformed_store_yields_default_template() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prompts.json");
    std::fs::write(&path, "{ not json").unwrap();
    let store = PromptStore::new(&path);
    assert_eq!(store.load_all(), vec![default_template()]);
}

#[test]
fn default_template_carries_core_placeholders() {
    let body = default_template().body;
    for key in ["{titulo}", "{tipoObra}", "{localizacao}", "{descricao}", "{arquivosInfo}"] {
        assert!(body.contains(key), "missing {key}");
    }
}

#[test]
fn get_active_returns_first_active() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store
        .save_all(&[template("a", false), template("b", true), template("c", true)])
        .unwrap();
    assert_eq!(store.get_active().id, "b");
}

#[test]
fn get_active_without_active_entry_falls_back_to_default() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.save_all(&[template("a", false)]).unwrap();
    assert_eq!(store.get_active(), default_template());
}

#[test]
fn get_by_id_finds_or_misses() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.save_all(&[template("a", false)]).unwrap();
    assert_eq!(store.get_by_id("a").unwrap().name, "nome a");
    assert!(store.get_by_id("zzz").is_none());
}

// =============================================================================
// persistence
// =============================================================================

#[test]
fn save_all_uses_persisted_field_names() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.save_all(&[template("a", true)]).unwrap();

    let raw = std::fs::read_to_string(store.path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let first = &value[0];
    assert_eq!(first["id"], "a");
    assert_eq!(first["nome"], "nome a");
    assert_eq!(first["prompt"], "corpo a {titulo}");
    assert_eq!(first["ativo"], true);
    assert!(first.get("descricao").is_some());
    assert!(raw.contains('\n'), "expected pretty-printed JSON");
}

#[test]
fn save_all_leaves_no_temp_files_behind() {
    let dir = tempfile::tempdir().unwrap();
    let store = PromptStore::new(dir.path().join("prompts.json"));
    store.save_all(&[template("a", true)]).unwrap();
    store.save_all(&[template("b", true)]).unwrap();

    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["prompts.json".to_string()]);
}

#[test]
fn save_all_into_unwritable_location_is_persistence_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();
    let store = PromptStore::new(blocker.join("prompts.json"));

    let err = store.save_all(&[template("a", true)]).unwrap_err();
    assert!(matches!(err, PromptStoreError::Persistence { .. }));
    assert_eq!(crate::error::ErrorCode::error_code(&err), "E_PROMPT_PERSISTENCE");
}

#[test]
fn failed_rename_cleans_up_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("prompts.json");
    std::fs::create_dir(&target).unwrap();
    std::fs::write(target.join("keep"), "x").unwrap();
    let store = PromptStore::new(&target);

    assert!(store.save_all(&[template("a", true)]).is_err());
    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["prompts.json".to_string()]);
}

// =============================================================================
// create / update
// =============================================================================

#[test]
fn create_assigns_id_and_inactive_default() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.save_all(&[template("a", true)]).unwrap();

    let created = store
        .create(NewPrompt { name: "Novo".into(), body: "b".into(), ..NewPrompt::default() })
        .unwrap();
    assert!(created.id.starts_with("prompt-"));
    assert!(!created.active);

    let all = store.load_all();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1], created);
}

#[test]
fn create_keeps_supplied_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let created = store
        .create(NewPrompt { id: Some("meu".into()), active: Some(true), ..NewPrompt::default() })
        .unwrap();
    assert_eq!(created.id, "meu");
    assert!(created.active);
}

#[test]
fn create_on_missing_store_keeps_default_alongside() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.create(NewPrompt { id: Some("x".into()), ..NewPrompt::default() }).unwrap();
    let ids: Vec<_> = store.load_all().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![DEFAULT_TEMPLATE_ID.to_string(), "x".to_string()]);
}

#[test]
fn update_merges_fields_and_keeps_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.save_all(&[template("a", false)]).unwrap();

    let updated = store
        .update("a", PromptPatch { body: Some("novo corpo".into()), active: Some(true), ..PromptPatch::default() })
        .unwrap()
        .unwrap();
    assert_eq!(updated.id, "a");
    assert_eq!(updated.name, "nome a");
    assert_eq!(updated.body, "novo corpo");
    assert!(updated.active);
    assert_eq!(store.get_active().body, "novo corpo");
}

#[test]
fn update_unknown_id_is_none_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    assert!(store.update("nada", PromptPatch::default()).unwrap().is_none());
    assert!(!store.path().exists());
}

#[test]
fn patch_ignores_id_field_in_body() {
    let patch: PromptPatch = serde_json::from_str(r#"{"id":"outro","nome":"N"}"#).unwrap();
    assert_eq!(patch.name.as_deref(), Some("N"));
}

// =============================================================================
// concurrency
// =============================================================================

#[tokio::test]
async fn concurrent_creates_are_all_kept() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(store_in(&dir));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .blocking(move |s| s.create(NewPrompt { id: Some(format!("p{i}")), ..NewPrompt::default() }))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap().unwrap();
    }

    let all = store.blocking(PromptStore::load_all).await.unwrap();
    assert_eq!(all.len(), 9);
}
