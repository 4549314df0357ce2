use super::{queries, RecordStore, ToolInstanceRecord, ToolTemplateRecord, WorkflowRecord};
use anyhow::Result;

async fn setup_store() -> Result<RecordStore> {
    let store = RecordStore::in_memory().await?;
    store.init_schema().await?;
    Ok(store)
}

fn sample_instance(id: &str, workflow_id: &str) -> ToolInstanceRecord {
    ToolInstanceRecord {
        id: id.to_string(),
        workflow_id: workflow_id.to_string(),
        name: "Sample".to_string(),
        source_folder_path: format!("/data/{workflow_id}/tools/sample_{id}"),
        code_file_name: "tool.py".to_string(),
        requirements_file_name: "requirements.txt".to_string(),
        icon_path: String::new(),
        is_venv_tool: true,
    }
}

#[tokio::test]
async fn test_workflow_roundtrip() -> Result<()> {
    let store = setup_store().await?;
    let mut conn = store.acquire().await?;

    let workflow = WorkflowRecord {
        id: "wf1".to_string(),
        name: "Workflow One".to_string(),
        directory: "/data/wf1".to_string(),
    };
    queries::insert_workflow(&mut conn, &workflow).await?;

    let fetched = queries::get_workflow(&mut conn, "wf1").await?;
    let fetched = fetched.expect("workflow should exist");
    assert_eq!(fetched.directory, "/data/wf1");

    assert!(queries::get_workflow(&mut conn, "missing").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_template_roundtrip() -> Result<()> {
    let store = setup_store().await?;
    let mut conn = store.acquire().await?;

    let template = ToolTemplateRecord {
        id: "tpl1".to_string(),
        name: "Calculator".to_string(),
        source_folder_path: "/templates/calculator".to_string(),
        icon_path: String::new(),
        code_file_name: "tool.py".to_string(),
        requirements_file_name: "requirements.txt".to_string(),
        is_venv_tool: false,
    };
    queries::insert_template(&mut conn, &template).await?;

    let fetched = queries::get_template(&mut conn, "tpl1").await?;
    let fetched = fetched.expect("template should exist");
    assert_eq!(fetched.name, "Calculator");
    assert!(!fetched.is_venv_tool);

    Ok(())
}

#[tokio::test]
async fn test_instance_crud() -> Result<()> {
    let store = setup_store().await?;
    let mut conn = store.acquire().await?;

    queries::insert_instance(&mut conn, &sample_instance("a", "wf1")).await?;
    queries::insert_instance(&mut conn, &sample_instance("b", "wf1")).await?;
    queries::insert_instance(&mut conn, &sample_instance("c", "wf2")).await?;

    let all = queries::list_instances(&mut conn, None).await?;
    assert_eq!(all.len(), 3);

    let wf1_only = queries::list_instances(&mut conn, Some("wf1")).await?;
    assert_eq!(wf1_only.len(), 2);
    assert!(wf1_only.iter().all(|i| i.workflow_id == "wf1"));

    let mut updated = sample_instance("a", "wf1");
    updated.name = "Renamed".to_string();
    updated.icon_path = "/assets/tool_icons/a_icon.png".to_string();
    queries::update_instance(&mut conn, &updated).await?;

    let fetched = queries::get_instance(&mut conn, "a").await?;
    let fetched = fetched.expect("instance should exist");
    assert_eq!(fetched.name, "Renamed");
    assert_eq!(fetched.icon_path, "/assets/tool_icons/a_icon.png");
    // Immutable fields are untouched by update.
    assert_eq!(fetched.code_file_name, "tool.py");

    assert!(queries::delete_instance(&mut conn, "a").await?);
    assert!(!queries::delete_instance(&mut conn, "a").await?);
    assert!(queries::get_instance(&mut conn, "a").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_transaction_rolls_back_on_drop() -> Result<()> {
    let store = setup_store().await?;

    {
        let mut tx = store.begin().await?;
        queries::insert_instance(&mut tx, &sample_instance("x", "wf1")).await?;
        // Dropped without commit.
    }

    let mut conn = store.acquire().await?;
    assert!(queries::get_instance(&mut conn, "x").await?.is_none());

    Ok(())
}
