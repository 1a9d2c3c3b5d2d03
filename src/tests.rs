#[cfg(test)]
mod integration_tests {
    use crate::handlers::projects::CreateProjectRequest;
    use crate::schemas::{ApiResponse, ErrorResponse, HealthResponse};
    use crate::test_utils::test_utils::{
        ACCOUNTANT, ADMIN, MANAGER, VISUALIZER, as_user, setup_test_app,
    };
    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use rust_decimal::Decimal;
    use serde_json::{Value, json};
    use std::future::IntoFuture;
    use std::str::FromStr;

    fn dec(value: &Value) -> Decimal {
        let raw = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Decimal::from_str(&raw).unwrap_or_else(|_| panic!("not a decimal: {}", value))
    }

    async fn test_server() -> TestServer {
        TestServer::new(setup_test_app().await).unwrap()
    }

    async fn create_project(server: &TestServer, code: &str) -> i32 {
        let request = CreateProjectRequest {
            name: format!("Proyecto {}", code),
            code: code.to_string(),
            description: None,
            location: Some("Tegucigalpa".to_string()),
            status: None,
            estimated_budget: Decimal::new(250_000, 0),
            actual_budget: None,
            currency: Some("USD".to_string()),
            exchange_rate: None,
            start_date: None,
            end_date: None,
        };
        let response = as_user(server.post("/api/v1/projects"), ADMIN)
            .json(&request)
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<Value> = response.json();
        body.data["id"].as_i64().unwrap() as i32
    }

    async fn create_budget_item(server: &TestServer, project_id: i32, category: &str, quantity: &str, unit_price: &str) {
        as_user(server.post("/api/v1/budgets"), ADMIN)
            .json(&json!({
                "project_id": project_id,
                "category": category,
                "description": format!("Partida de {}", category),
                "quantity": quantity,
                "unit_price": unit_price,
            }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    async fn create_expense(server: &TestServer, project_id: i32, category: &str, amount: &str, date: &str) {
        as_user(server.post("/api/v1/expenses"), ACCOUNTANT)
            .json(&json!({
                "project_id": project_id,
                "description": format!("Gasto de {}", category),
                "amount": amount,
                "category": category,
                "date": date,
            }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    async fn create_purchase_order(server: &TestServer, body: Value) {
        as_user(server.post("/api/v1/purchase-orders"), MANAGER)
            .json(&body)
            .await
            .assert_status(StatusCode::CREATED);
    }

    async fn budget_report(server: &TestServer, project_id: i32) -> Value {
        let response = as_user(
            server.get(&format!("/api/v1/projects/{}/budget-report", project_id)),
            VISUALIZER,
        )
        .await;
        response.assert_status_ok();
        let body: ApiResponse<Value> = response.json();
        body.data
    }

    fn row<'a>(report: &'a Value, category: &str) -> &'a Value {
        report["rows"]
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["category"] == category)
            .unwrap_or_else(|| panic!("no row for {}", category))
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = test_server().await;

        let response = server.get("/health").await;

        response.assert_status(StatusCode::OK);
        let body: HealthResponse = response.json();
        assert_eq!(body.status, "healthy");
        assert_eq!(body.database, "connected");
    }

    #[tokio::test]
    async fn test_requests_without_user_are_rejected() {
        let server = test_server().await;

        let response = server.get("/api/v1/projects").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "UNAUTHORIZED");
        assert!(!body.success);

        let response = server
            .get("/api/v1/projects")
            .add_header(
                HeaderName::from_static("x-user-id"),
                HeaderValue::from_static("not-a-number"),
            )
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "UNAUTHORIZED");

        let response = as_user(server.get("/api/v1/projects"), 999).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "UNKNOWN_USER");
    }

    #[tokio::test]
    async fn test_visualizer_is_read_only() {
        let server = test_server().await;
        let project_id = create_project(&server, "RO-01").await;

        as_user(server.get("/api/v1/projects"), VISUALIZER)
            .await
            .assert_status_ok();
        as_user(server.get(&format!("/api/v1/projects/{}", project_id)), VISUALIZER)
            .await
            .assert_status_ok();

        let response = as_user(server.post("/api/v1/projects"), VISUALIZER)
            .json(&json!({
                "name": "Bodega",
                "code": "RO-02",
                "estimated_budget": "1000",
            }))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "FORBIDDEN");

        as_user(server.put(&format!("/api/v1/projects/{}", project_id)), VISUALIZER)
            .json(&json!({ "name": "Otro nombre" }))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_only_managers_and_admins_delete() {
        let server = test_server().await;
        let project_id = create_project(&server, "DEL-01").await;
        let path = format!("/api/v1/projects/{}", project_id);

        as_user(server.put(&path), ACCOUNTANT)
            .json(&json!({ "location": "San Pedro Sula" }))
            .await
            .assert_status_ok();
        as_user(server.delete(&path), ACCOUNTANT)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        as_user(server.delete(&path), MANAGER).await.assert_status_ok();

        let response = as_user(server.get(&path), ADMIN).await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "NOT_FOUND");

        as_user(server.delete(&path), MANAGER)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_duplicate_project_code() {
        let server = test_server().await;
        create_project(&server, "DUP-01").await;

        let response = as_user(server.post("/api/v1/projects"), ADMIN)
            .json(&json!({
                "name": "Copia",
                "code": "DUP-01",
                "estimated_budget": "1000",
            }))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "DUPLICATE_PROJECT_CODE");
    }

    #[tokio::test]
    async fn test_project_search_and_status_filter() {
        let server = test_server().await;
        create_project(&server, "LOM-01").await;
        create_project(&server, "VAL-01").await;

        let response = as_user(server.get("/api/v1/projects?search=LOM"), VISUALIZER).await;
        response.assert_status_ok();
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 1);
        assert_eq!(body.data[0]["code"], "LOM-01");

        let response = as_user(server.get("/api/v1/projects?status=planning"), VISUALIZER).await;
        response.assert_status_ok();
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 2);

        as_user(server.get("/api/v1/projects?status=SOMEDAY"), VISUALIZER)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_user_management_is_admin_only() {
        let server = test_server().await;
        let new_user = json!({
            "username": "residente",
            "full_name": "Rosa Residente",
            "email": "rosa@example.com",
            "role": "accountant",
        });

        as_user(server.post("/api/v1/users"), MANAGER)
            .json(&new_user)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let response = as_user(server.post("/api/v1/users"), ADMIN)
            .json(&new_user)
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.message, "User created successfully");
        assert_eq!(body.data["role"], "ACCOUNTANT");

        let response = as_user(server.post("/api/v1/users"), ADMIN)
            .json(&new_user)
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "DUPLICATE_USERNAME");

        let response = as_user(server.get("/api/v1/users?role=ACCOUNTANT"), VISUALIZER).await;
        response.assert_status_ok();
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 2);

        as_user(server.post("/api/v1/users"), ADMIN)
            .json(&json!({ "username": "x", "full_name": "X", "role": "OWNER" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_budget_item_total_is_computed() {
        let server = test_server().await;
        let project_id = create_project(&server, "BUD-01").await;

        let response = as_user(server.post("/api/v1/budgets"), ACCOUNTANT)
            .json(&json!({
                "project_id": project_id,
                "category": "Materiales",
                "description": "Cemento",
                "quantity": "100",
                "unit_price": "850",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<Value> = response.json();
        assert_eq!(dec(&body.data["total_price"]), Decimal::new(85_000, 0));
        assert_eq!(body.data["currency"], "USD");
        assert_eq!(body.data["created_by_id"], ACCOUNTANT);
        let item_id = body.data["id"].as_i64().unwrap();

        let response = as_user(server.put(&format!("/api/v1/budgets/{}", item_id)), ACCOUNTANT)
            .json(&json!({ "quantity": "10" }))
            .await;
        response.assert_status_ok();
        let body: ApiResponse<Value> = response.json();
        assert_eq!(dec(&body.data["total_price"]), Decimal::new(8_500, 0));

        let response = as_user(
            server.get(&format!("/api/v1/projects/{}/budgets", project_id)),
            VISUALIZER,
        )
        .await;
        response.assert_status_ok();
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 1);
    }

    #[tokio::test]
    async fn test_budget_item_rejects_unknown_category_and_project() {
        let server = test_server().await;
        let project_id = create_project(&server, "BUD-02").await;

        let response = as_user(server.post("/api/v1/budgets"), ADMIN)
            .json(&json!({
                "project_id": project_id,
                "category": "Catering",
                "description": "Almuerzos",
                "quantity": "1",
                "unit_price": "10",
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "INVALID_CATEGORY");

        let response = as_user(server.post("/api/v1/budgets"), ADMIN)
            .json(&json!({
                "project_id": 4242,
                "category": "Materiales",
                "description": "Cemento",
                "quantity": "1",
                "unit_price": "10",
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "INVALID_PROJECT_ID");
    }

    #[tokio::test]
    async fn test_project_scoped_list_of_missing_project() {
        let server = test_server().await;

        let response = as_user(server.get("/api/v1/projects/4242/expenses"), VISUALIZER).await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_budget_report_warning_with_committed_orders() {
        let server = test_server().await;
        let project_id = create_project(&server, "REP-01").await;
        create_budget_item(&server, project_id, "Materiales", "100", "850").await;
        create_expense(&server, project_id, "Materiales", "65000", "2024-02-03").await;
        create_purchase_order(
            &server,
            json!({
                "project_id": project_id,
                "order_number": "OC-1",
                "description": "Bloques",
                "category": "Materiales",
                "amount": "3000",
                "is_committed": true,
            }),
        )
        .await;
        // No explicit category: matched through the description
        create_purchase_order(
            &server,
            json!({
                "project_id": project_id,
                "order_number": "OC-2",
                "description": "Compra de MATERIALES de acabado",
                "amount": "2000",
                "is_committed": true,
            }),
        )
        .await;
        // Not committed: ignored
        create_purchase_order(
            &server,
            json!({
                "project_id": project_id,
                "order_number": "OC-3",
                "description": "Materiales eléctricos",
                "amount": "9000",
                "is_committed": false,
            }),
        )
        .await;

        let report = budget_report(&server, project_id).await;
        assert_eq!(report["currency"], "USD");
        assert_eq!(report["rows"].as_array().unwrap().len(), 1);

        let materiales = row(&report, "Materiales");
        assert_eq!(dec(&materiales["initial_budget"]), Decimal::new(85_000, 0));
        assert_eq!(dec(&materiales["revised_budget"]), Decimal::new(85_000, 0));
        assert_eq!(dec(&materiales["committed_amount"]), Decimal::new(5_000, 0));
        assert_eq!(dec(&materiales["real_expenses"]), Decimal::new(65_000, 0));
        assert_eq!(dec(&materiales["real_plus_committed"]), Decimal::new(70_000, 0));
        assert_eq!(dec(&materiales["budget_balance"]), Decimal::new(20_000, 0));
        assert_eq!(dec(&materiales["available_balance"]), Decimal::new(15_000, 0));
        assert_eq!(
            dec(&materiales["usage_percentage"]).round_dp(2),
            Decimal::from_str("82.35").unwrap()
        );
        assert_eq!(materiales["status"], "warning");
        assert_eq!(report["totals"]["status"], "warning");
    }

    #[tokio::test]
    async fn test_budget_report_danger_and_unbudgeted_category() {
        let server = test_server().await;
        let project_id = create_project(&server, "REP-02").await;
        create_budget_item(&server, project_id, "Materiales", "100", "850").await;
        create_expense(&server, project_id, "Materiales", "90000", "2024-02-03").await;
        create_expense(&server, project_id, "Transporte", "1200", "2024-02-20").await;

        let report = budget_report(&server, project_id).await;
        let rows = report["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["category"], "Materiales");
        assert_eq!(rows[1]["category"], "Transporte");

        let materiales = row(&report, "Materiales");
        assert_eq!(materiales["status"], "danger");
        assert_eq!(dec(&materiales["available_balance"]), Decimal::new(-5_000, 0));
        assert_eq!(
            dec(&materiales["usage_percentage"]).round_dp(2),
            Decimal::from_str("105.88").unwrap()
        );

        let transporte = row(&report, "Transporte");
        assert_eq!(transporte["is_unbudgeted"], true);
        assert_eq!(dec(&transporte["revised_budget"]), Decimal::ZERO);
        assert_eq!(dec(&transporte["real_expenses"]), Decimal::new(1_200, 0));
        assert!(transporte["usage_percentage"].is_null());
        assert_eq!(transporte["status"], "danger");

        assert_eq!(dec(&report["totals"]["real_expenses"]), Decimal::new(91_200, 0));
    }

    #[tokio::test]
    async fn test_budget_report_refreshes_after_new_expense() {
        let server = test_server().await;
        let project_id = create_project(&server, "REP-03").await;
        create_budget_item(&server, project_id, "Equipos", "2", "5000").await;

        let report = budget_report(&server, project_id).await;
        assert_eq!(dec(&row(&report, "Equipos")["real_expenses"]), Decimal::ZERO);
        assert_eq!(row(&report, "Equipos")["status"], "normal");

        create_expense(&server, project_id, "Equipos", "4000", "2024-05-01").await;

        let report = budget_report(&server, project_id).await;
        assert_eq!(dec(&row(&report, "Equipos")["real_expenses"]), Decimal::new(4_000, 0));
    }

    #[tokio::test]
    async fn test_budget_report_of_missing_project() {
        let server = test_server().await;

        let response = as_user(server.get("/api/v1/projects/4242/budget-report"), ADMIN).await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_project_summary() {
        let server = test_server().await;
        let project_id = create_project(&server, "SUM-01").await;
        create_budget_item(&server, project_id, "Materiales", "100", "850").await;
        create_expense(&server, project_id, "Materiales", "40000", "2024-02-03").await;
        create_expense(&server, project_id, "Transporte", "1200", "2024-02-20").await;
        as_user(server.post("/api/v1/tasks"), MANAGER)
            .json(&json!({ "project_id": project_id, "title": "Fundición de losa" }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = as_user(
            server.get(&format!("/api/v1/projects/{}/summary", project_id)),
            VISUALIZER,
        )
        .await;
        response.assert_status_ok();
        let body: ApiResponse<Value> = response.json();
        let summary = body.data;

        assert_eq!(dec(&summary["estimated_budget"]), Decimal::new(250_000, 0));
        assert_eq!(dec(&summary["total_budgeted"]), Decimal::new(85_000, 0));
        assert_eq!(dec(&summary["total_expenses"]), Decimal::new(41_200, 0));
        assert_eq!(dec(&summary["remaining_budget"]), Decimal::new(208_800, 0));
        let todo = summary["tasks"]
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["status"] == "TODO")
            .unwrap();
        assert_eq!(todo["count"], 1);
        assert_eq!(summary["low_stock_materials"], 0);
    }

    #[tokio::test]
    async fn test_monthly_expenses() {
        let server = test_server().await;
        let project_id = create_project(&server, "MON-01").await;
        create_expense(&server, project_id, "Materiales", "40000", "2024-02-03").await;
        create_expense(&server, project_id, "Materiales", "2500", "2024-02-27").await;
        create_expense(&server, project_id, "Materiales", "30000", "2024-03-10").await;

        let path = format!("/api/v1/projects/{}/expenses/monthly", project_id);
        let response = as_user(server.get(&path), VISUALIZER).await;
        response.assert_status_ok();
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 2);
        assert_eq!(body.data[0]["month"], "2024-02-01");
        assert_eq!(dec(&body.data[0]["amount"]), Decimal::new(42_500, 0));
        assert_eq!(body.data[0]["count"], 2);
        assert_eq!(body.data[1]["month"], "2024-03-01");

        let response = as_user(
            server.get(&format!("{}?start_date=2024-03-01", path)),
            VISUALIZER,
        )
        .await;
        response.assert_status_ok();
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 1);
        assert_eq!(dec(&body.data[0]["amount"]), Decimal::new(30_000, 0));

        let response = as_user(
            server.get(&format!("{}?start_date=2024-04-01&end_date=2024-03-01", path)),
            VISUALIZER,
        )
        .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "INVALID_DATE_RANGE");
    }

    #[tokio::test]
    async fn test_invoice_due_before_issue_is_rejected() {
        let server = test_server().await;
        let project_id = create_project(&server, "INV-01").await;

        let response = as_user(server.post("/api/v1/invoices"), ACCOUNTANT)
            .json(&json!({
                "project_id": project_id,
                "invoice_number": "F-001",
                "supplier": "Ferretería Central",
                "amount": "1500",
                "issue_date": "2024-03-10",
                "due_date": "2024-03-01",
                "category": "Materiales",
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "INVALID_DATE_RANGE");
    }

    #[tokio::test]
    async fn test_pending_invoice_past_due_is_overdue() {
        let server = test_server().await;
        let project_id = create_project(&server, "INV-02").await;

        let response = as_user(server.post("/api/v1/invoices"), ACCOUNTANT)
            .json(&json!({
                "project_id": project_id,
                "invoice_number": "F-002",
                "supplier": "Ferretería Central",
                "amount": "1500",
                "issue_date": "2020-01-10",
                "due_date": "2020-02-10",
                "category": "Materiales",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["status"], "PENDING");
        assert_eq!(body.data["effective_status"], "OVERDUE");
    }

    async fn create_material(server: &TestServer, code: &str, base_price: &str) -> i32 {
        let response = as_user(server.post("/api/v1/materials"), ADMIN)
            .json(&json!({
                "name": format!("Material {}", code),
                "code": code,
                "unit": "saco",
                "base_price": base_price,
                "category": "Materiales",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<Value> = response.json();
        body.data["id"].as_i64().unwrap() as i32
    }

    #[tokio::test]
    async fn test_material_request_workflow_adds_stock() {
        let server = test_server().await;
        let project_id = create_project(&server, "MAT-01").await;
        let material_id = create_material(&server, "MAT-001", "8.75").await;

        let response = as_user(server.post("/api/v1/material-requests"), ACCOUNTANT)
            .json(&json!({
                "project_id": project_id,
                "material_id": material_id,
                "quantity": "40",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["status"], "PENDING");
        assert_eq!(body.data["requested_by_id"], ACCOUNTANT);
        let request_id = body.data["id"].as_i64().unwrap();
        let base = format!("/api/v1/material-requests/{}", request_id);

        as_user(server.post(&format!("{}/approve", base)), ACCOUNTANT)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let response = as_user(server.post(&format!("{}/deliver", base)), MANAGER).await;
        response.assert_status(StatusCode::CONFLICT);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "INVALID_STATUS_TRANSITION");

        let response = as_user(server.post(&format!("{}/approve", base)), MANAGER).await;
        response.assert_status_ok();
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["status"], "APPROVED");

        as_user(server.post(&format!("{}/reject", base)), MANAGER)
            .await
            .assert_status(StatusCode::CONFLICT);

        let response = as_user(server.post(&format!("{}/deliver", base)), MANAGER).await;
        response.assert_status_ok();
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["status"], "DELIVERED");

        let response = as_user(
            server.get(&format!("/api/v1/projects/{}/materials", project_id)),
            VISUALIZER,
        )
        .await;
        response.assert_status_ok();
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 1);
        assert_eq!(dec(&body.data[0]["quantity"]), Decimal::new(40, 0));
        assert_eq!(dec(&body.data[0]["unit_price"]), Decimal::from_str("8.75").unwrap());

        // A second delivery adds to the same stock line
        let response = as_user(server.post("/api/v1/material-requests"), ACCOUNTANT)
            .json(&json!({
                "project_id": project_id,
                "material_id": material_id,
                "quantity": "15",
            }))
            .await;
        let body: ApiResponse<Value> = response.json();
        let second = format!("/api/v1/material-requests/{}", body.data["id"].as_i64().unwrap());
        as_user(server.post(&format!("{}/approve", second)), ADMIN)
            .await
            .assert_status_ok();
        as_user(server.post(&format!("{}/deliver", second)), ADMIN)
            .await
            .assert_status_ok();

        let response = as_user(
            server.get(&format!("/api/v1/project-materials?project_id={}", project_id)),
            VISUALIZER,
        )
        .await;
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 1);
        assert_eq!(dec(&body.data[0]["quantity"]), Decimal::new(55, 0));
    }

    #[tokio::test]
    async fn test_low_stock_materials() {
        let server = test_server().await;
        let project_id = create_project(&server, "LOW-01").await;
        let cement = create_material(&server, "MAT-010", "8.75").await;
        let rebar = create_material(&server, "MAT-011", "12.50").await;

        for (material_id, quantity, minimum_stock) in [(cement, "10", "50"), (rebar, "400", "100")] {
            as_user(server.post("/api/v1/project-materials"), ACCOUNTANT)
                .json(&json!({
                    "project_id": project_id,
                    "material_id": material_id,
                    "quantity": quantity,
                    "minimum_stock": minimum_stock,
                }))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let response = as_user(
            server.get(&format!("/api/v1/projects/{}/materials/low-stock", project_id)),
            VISUALIZER,
        )
        .await;
        response.assert_status_ok();
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 1);
        assert_eq!(body.data[0]["material_id"], cement);
        assert_eq!(dec(&body.data[0]["shortfall"]), Decimal::new(40, 0));

        let response = as_user(server.post("/api/v1/project-materials"), ACCOUNTANT)
            .json(&json!({
                "project_id": project_id,
                "material_id": cement,
                "quantity": "5",
            }))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "DUPLICATE_PROJECT_MATERIAL");
    }

    #[tokio::test]
    async fn test_settings_are_admin_managed() {
        let server = test_server().await;
        let path = "/api/v1/settings/company_name";

        as_user(server.put(path), MANAGER)
            .json(&json!({ "value": "Constructora Lomas" }))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        as_user(server.put(path), ADMIN)
            .json(&json!({ "value": "Constructora Lomas", "description": "Shown in reports" }))
            .await
            .assert_status_ok();
        as_user(server.put(path), ADMIN)
            .json(&json!({ "value": "Constructora Las Lomas" }))
            .await
            .assert_status_ok();

        let response = as_user(server.get(path), VISUALIZER).await;
        response.assert_status_ok();
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["value"], "Constructora Las Lomas");
        assert_eq!(body.data["description"], "Shown in reports");

        as_user(server.delete(path), ADMIN).await.assert_status_ok();
        as_user(server.get(path), ADMIN)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_budget_item_total_overflow_is_rejected() {
        let server = test_server().await;
        let project_id = create_project(&server, "BUD-03").await;

        let response = as_user(server.post("/api/v1/budgets"), ADMIN)
            .json(&json!({
                "project_id": project_id,
                "category": "Materiales",
                "description": "Cemento",
                "quantity": "100000000000000000000",
                "unit_price": "100000000000000000000",
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_concurrent_deliveries_add_stock_once() {
        let server = test_server().await;
        let project_id = create_project(&server, "MAT-02").await;
        let material_id = create_material(&server, "MAT-002", "8.75").await;

        let response = as_user(server.post("/api/v1/material-requests"), ACCOUNTANT)
            .json(&json!({
                "project_id": project_id,
                "material_id": material_id,
                "quantity": "40",
            }))
            .await;
        let body: ApiResponse<Value> = response.json();
        let base = format!("/api/v1/material-requests/{}", body.data["id"].as_i64().unwrap());
        as_user(server.post(&format!("{}/approve", base)), MANAGER)
            .await
            .assert_status_ok();

        let deliver = format!("{}/deliver", base);
        let (first, second) = tokio::join!(
            as_user(server.post(&deliver), MANAGER).into_future(),
            as_user(server.post(&deliver), ADMIN).into_future()
        );
        let mut statuses = vec![first.status_code(), second.status_code()];
        statuses.sort();
        assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);

        let response = as_user(
            server.get(&format!("/api/v1/projects/{}/materials", project_id)),
            VISUALIZER,
        )
        .await;
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 1);
        assert_eq!(dec(&body.data[0]["quantity"]), Decimal::new(40, 0));
    }

    #[tokio::test]
    async fn test_purchase_order_category_is_validated_and_clearable() {
        let server = test_server().await;
        let project_id = create_project(&server, "OC-01").await;
        create_budget_item(&server, project_id, "Materiales", "100", "850").await;
        create_budget_item(&server, project_id, "Equipos", "1", "20000").await;

        let order = json!({
            "project_id": project_id,
            "order_number": "OC-100",
            "description": "Equipos de bombeo",
            "category": "materiales",
            "amount": "5000",
            "is_committed": true,
        });
        let response = as_user(server.post("/api/v1/purchase-orders"), MANAGER)
            .json(&order)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "INVALID_CATEGORY");

        let mut order = order;
        order["category"] = json!("Materiales");
        let response = as_user(server.post("/api/v1/purchase-orders"), MANAGER)
            .json(&order)
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<Value> = response.json();
        let path = format!("/api/v1/purchase-orders/{}", body.data["id"].as_i64().unwrap());

        // The explicit category wins over the description
        let report = budget_report(&server, project_id).await;
        assert_eq!(dec(&row(&report, "Materiales")["committed_amount"]), Decimal::new(5_000, 0));
        assert_eq!(dec(&row(&report, "Equipos")["committed_amount"]), Decimal::ZERO);

        as_user(server.put(&path), MANAGER)
            .json(&json!({ "category": "Equipo" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let response = as_user(server.put(&path), MANAGER)
            .json(&json!({ "category": null }))
            .await;
        response.assert_status_ok();
        let body: ApiResponse<Value> = response.json();
        assert!(body.data["category"].is_null());

        // Without a category the description decides
        let report = budget_report(&server, project_id).await;
        assert_eq!(dec(&row(&report, "Materiales")["committed_amount"]), Decimal::ZERO);
        assert_eq!(dec(&row(&report, "Equipos")["committed_amount"]), Decimal::new(5_000, 0));
        assert_eq!(dec(&report["totals"]["committed_amount"]), Decimal::new(5_000, 0));
    }

    #[tokio::test]
    async fn test_purchase_order_filters_and_delete() {
        let server = test_server().await;
        let project_id = create_project(&server, "OC-02").await;
        for (number, committed, status) in [
            ("OC-201", true, "ISSUED"),
            ("OC-202", false, "DRAFT"),
            ("OC-203", true, "received"),
        ] {
            create_purchase_order(
                &server,
                json!({
                    "project_id": project_id,
                    "order_number": number,
                    "description": "Varilla corrugada",
                    "amount": "1000",
                    "is_committed": committed,
                    "status": status,
                }),
            )
            .await;
        }

        let list = |query: String| {
            let server = &server;
            async move {
                let response = as_user(
                    server.get(&format!("/api/v1/purchase-orders?project_id={}&{}", project_id, query)),
                    VISUALIZER,
                )
                .await;
                response.assert_status_ok();
                let body: ApiResponse<Vec<Value>> = response.json();
                body.data
            }
        };

        assert_eq!(list("is_committed=true".to_string()).await.len(), 2);
        let drafts = list("status=draft".to_string()).await;
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0]["order_number"], "OC-202");
        assert_eq!(list("is_committed=true&status=RECEIVED".to_string()).await.len(), 1);
        assert_eq!(list("search=OC-203".to_string()).await.len(), 1);

        let response = as_user(
            server.get(&format!("/api/v1/projects/{}/purchase-orders", project_id)),
            VISUALIZER,
        )
        .await;
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 3);

        let path = format!("/api/v1/purchase-orders/{}", drafts[0]["id"]);
        let response = as_user(server.put(&path), ACCOUNTANT)
            .json(&json!({ "amount": "1500", "is_committed": true }))
            .await;
        response.assert_status_ok();
        let body: ApiResponse<Value> = response.json();
        assert_eq!(dec(&body.data["amount"]), Decimal::new(1_500, 0));
        assert_eq!(list("is_committed=true".to_string()).await.len(), 3);

        as_user(server.delete(&path), ACCOUNTANT)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        as_user(server.delete(&path), MANAGER).await.assert_status_ok();
        as_user(server.get(&path), VISUALIZER)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_task_filters_update_and_delete() {
        let server = test_server().await;
        let project_id = create_project(&server, "TSK-01").await;
        let mut ids = Vec::new();
        for task in [
            json!({ "project_id": project_id, "title": "Excavación", "status": "IN_PROGRESS", "priority": "HIGH" }),
            json!({ "project_id": project_id, "title": "Armado de columnas" }),
            json!({ "project_id": project_id, "title": "Permiso municipal", "priority": "urgent" }),
        ] {
            let response = as_user(server.post("/api/v1/tasks"), MANAGER).json(&task).await;
            response.assert_status(StatusCode::CREATED);
            let body: ApiResponse<Value> = response.json();
            ids.push(body.data["id"].as_i64().unwrap());
        }

        let titles = |query: &'static str| {
            let server = &server;
            async move {
                let response = as_user(
                    server.get(&format!("/api/v1/tasks?project_id={}&{}", project_id, query)),
                    VISUALIZER,
                )
                .await;
                response.assert_status_ok();
                let body: ApiResponse<Vec<Value>> = response.json();
                body.data
                    .iter()
                    .map(|t| t["title"].as_str().unwrap().to_string())
                    .collect::<Vec<_>>()
            }
        };

        assert_eq!(titles("status=in_progress").await, vec!["Excavación"]);
        assert_eq!(titles("priority=URGENT").await, vec!["Permiso municipal"]);
        assert_eq!(titles("status=TODO&priority=MEDIUM").await, vec!["Armado de columnas"]);
        assert_eq!(titles("status=TODO").await.len(), 2);
        as_user(server.get("/api/v1/tasks?priority=someday"), VISUALIZER)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let path = format!("/api/v1/tasks/{}", ids[1]);
        let response = as_user(server.put(&path), ACCOUNTANT)
            .json(&json!({ "status": "completed", "due_date": "2024-07-01" }))
            .await;
        response.assert_status_ok();
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["status"], "COMPLETED");
        assert_eq!(body.data["due_date"], "2024-07-01");

        let response = as_user(server.put(&path), ACCOUNTANT)
            .json(&json!({ "due_date": null }))
            .await;
        response.assert_status_ok();
        let body: ApiResponse<Value> = response.json();
        assert!(body.data["due_date"].is_null());
        assert_eq!(body.data["status"], "COMPLETED");

        as_user(server.delete(&path), ACCOUNTANT)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        as_user(server.delete(&path), MANAGER).await.assert_status_ok();
        as_user(server.get(&path), VISUALIZER)
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let response = as_user(
            server.get(&format!("/api/v1/projects/{}/tasks", project_id)),
            VISUALIZER,
        )
        .await;
        let body: ApiResponse<Vec<Value>> = response.json();
        assert_eq!(body.data.len(), 2);
    }

    #[tokio::test]
    async fn test_expense_filters_and_clearing_fields() {
        let server = test_server().await;
        let project_id = create_project(&server, "EXP-01").await;

        let response = as_user(server.post("/api/v1/budgets"), ADMIN)
            .json(&json!({
                "project_id": project_id,
                "category": "Materiales",
                "description": "Obra gris",
                "quantity": "1",
                "unit_price": "50000",
            }))
            .await;
        let body: ApiResponse<Value> = response.json();
        let budget_item_id = body.data["id"].as_i64().unwrap();

        let mut ids = Vec::new();
        for (description, category, supplier) in [
            ("Cemento gris", "Materiales", "Ferreteria Central"),
            ("Bloques de 6", "Materiales", "Bloquera Honduras"),
            ("Flete de arena", "Transporte", "Ferreteria Central"),
        ] {
            let response = as_user(server.post("/api/v1/expenses"), ACCOUNTANT)
                .json(&json!({
                    "project_id": project_id,
                    "budget_item_id": if category == "Materiales" { json!(budget_item_id) } else { Value::Null },
                    "description": description,
                    "amount": "1000",
                    "category": category,
                    "supplier": supplier,
                    "date": "2024-04-02",
                }))
                .await;
            response.assert_status(StatusCode::CREATED);
            let body: ApiResponse<Value> = response.json();
            ids.push(body.data["id"].as_i64().unwrap());
        }

        let count = |query: &'static str| {
            let server = &server;
            async move {
                let response = as_user(
                    server.get(&format!("/api/v1/expenses?project_id={}&{}", project_id, query)),
                    VISUALIZER,
                )
                .await;
                response.assert_status_ok();
                let body: ApiResponse<Vec<Value>> = response.json();
                body.data.len()
            }
        };

        assert_eq!(count("supplier=Ferreteria%20Central").await, 2);
        assert_eq!(count("category=Transporte").await, 1);
        assert_eq!(count("category=Materiales&supplier=Ferreteria%20Central").await, 1);
        assert_eq!(count("search=Bloques").await, 1);
        assert_eq!(count("search=Bloquera").await, 1);

        let path = format!("/api/v1/expenses/{}", ids[0]);
        let response = as_user(server.put(&path), ACCOUNTANT)
            .json(&json!({ "supplier": null, "budget_item_id": null }))
            .await;
        response.assert_status_ok();
        let body: ApiResponse<Value> = response.json();
        assert!(body.data["supplier"].is_null());
        assert!(body.data["budget_item_id"].is_null());
        assert_eq!(body.data["description"], "Cemento gris");

        assert_eq!(count("supplier=Ferreteria%20Central").await, 1);
    }

    #[tokio::test]
    async fn test_invoice_update_and_delete() {
        let server = test_server().await;
        let project_id = create_project(&server, "INV-03").await;

        let response = as_user(server.post("/api/v1/invoices"), ACCOUNTANT)
            .json(&json!({
                "project_id": project_id,
                "invoice_number": "F-003",
                "supplier": "Ferretería Central",
                "amount": "1500",
                "issue_date": "2024-03-01",
                "due_date": "2024-03-31",
                "category": "Materiales",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<Value> = response.json();
        let path = format!("/api/v1/invoices/{}", body.data["id"].as_i64().unwrap());

        let response = as_user(server.put(&path), ACCOUNTANT)
            .json(&json!({ "status": "paid" }))
            .await;
        response.assert_status_ok();
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["status"], "PAID");
        assert_eq!(body.data["effective_status"], "PAID");

        let response = as_user(server.put(&path), ACCOUNTANT)
            .json(&json!({ "due_date": "2024-02-01" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "INVALID_DATE_RANGE");

        let response = as_user(server.put(&path), ACCOUNTANT)
            .json(&json!({ "due_date": null }))
            .await;
        response.assert_status_ok();
        let body: ApiResponse<Value> = response.json();
        assert!(body.data["due_date"].is_null());

        as_user(server.delete(&path), ACCOUNTANT)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        as_user(server.delete(&path), MANAGER).await.assert_status_ok();
        as_user(server.get(&path), VISUALIZER)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_material_update_and_delete() {
        let server = test_server().await;
        let cement = create_material(&server, "MAT-020", "8.75").await;
        let rebar = create_material(&server, "MAT-021", "12.50").await;

        let path = format!("/api/v1/materials/{}", cement);
        let response = as_user(server.put(&path), ACCOUNTANT)
            .json(&json!({ "name": "Cemento gris", "base_price": "9.10" }))
            .await;
        response.assert_status_ok();
        let body: ApiResponse<Value> = response.json();
        assert_eq!(body.data["name"], "Cemento gris");
        assert_eq!(dec(&body.data["base_price"]), Decimal::from_str("9.10").unwrap());

        let response = as_user(server.put(&format!("/api/v1/materials/{}", rebar)), ADMIN)
            .json(&json!({ "code": "MAT-020" }))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "DUPLICATE_MATERIAL_CODE");

        as_user(server.delete(&path), ACCOUNTANT)
            .await
            .assert_status(StatusCode::FORBIDDEN);
        as_user(server.delete(&path), MANAGER).await.assert_status_ok();
        as_user(server.get(&path), VISUALIZER)
            .await
            .assert_status(StatusCode::NOT_FOUND);
        as_user(server.delete(&path), MANAGER)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_prometheus_metrics_endpoint() {
        let server = test_server().await;

        // Metrics are not mounted in test builds
        let response = server.get("/metrics").await;

        response.assert_status(StatusCode::NOT_FOUND);
    }
}
