//! Built-in scenarios for the dummyjson.com API.
//!
//! Credentials and login data come from the project configuration
//! (`valid_token`, `invalid_token`, `expired_token`, `login_username`,
//! `login_password`), so the suite can be pointed at any environment.

use apicheck_core::{
    config::project_prefix, Kind, Matcher, ProjectConfig, Request, ResponseContract, Scenario,
};
use eyre::WrapErr;
use serde_json::json;

fn credential<'a>(project: &'a ProjectConfig, key: &str) -> eyre::Result<&'a str> {
    project.get_str(key).wrap_err_with(|| {
        format!(
            "project \"{}\" needs \"{key}\"; set it in apicheck.toml or {}{}",
            project.name,
            project_prefix(&project.name),
            key.to_uppercase()
        )
    })
}

pub fn dummyjson(project: &ProjectConfig) -> eyre::Result<Vec<Scenario>> {
    let valid_token = credential(project, "valid_token")?;
    let invalid_token = credential(project, "invalid_token")?;
    let expired_token = credential(project, "expired_token")?;
    let username = credential(project, "login_username")?;
    let password = credential(project, "login_password")?;

    let scenarios = vec![
        Scenario::new(
            "get_status",
            Request::get("/test"),
            ResponseContract::new(200)?
                .expect("status", Matcher::equals("ok"))?
                .expect("method", Matcher::equals("GET"))?,
        ),
        Scenario::new(
            "get_users",
            Request::get("/users"),
            ResponseContract::new(200)?
                .expect("users", Matcher::NotEmpty)?
                .expect("users[0].firstName", Matcher::NotNull)?
                .expect("users[0].id", Matcher::equals(1))?
                .expect("users[1].firstName", Matcher::NotNull)?
                .expect("users[1].id", Matcher::equals(2))?
                .expect(
                    "users[0].email",
                    Matcher::equals("emily.johnson@x.dummyjson.com"),
                )?
                .expect(
                    "users[1].email",
                    Matcher::equals("michael.williams@x.dummyjson.com"),
                )?
                .expect("users[0].address", Matcher::NotNull)?
                .expect("users[1].address", Matcher::NotNull)?,
        ),
        Scenario::new(
            "login",
            Request::post("/auth/login")
                .json(&json!({"username": username, "password": password})),
            ResponseContract::new(200)?
                .expect("id", Matcher::equals(1))?
                .expect("username", Matcher::equals(username))?
                .expect("email", Matcher::equals("emily.johnson@x.dummyjson.com"))?
                .expect("firstName", Matcher::equals("Emily"))?
                .expect("lastName", Matcher::equals("Johnson"))?
                .expect("gender", Matcher::equals("female"))?
                .expect(
                    "image",
                    Matcher::equals("https://dummyjson.com/icon/emilys/128"),
                )?,
        ),
        // Expects 401 together with a non-empty product list. The two
        // cannot both hold for a real response; kept as declared until the
        // API owner confirms which one is intended.
        Scenario::new(
            "products_with_valid_token",
            Request::get("/auth/products")
                .header("Content-Type", "application/json")
                .bearer(valid_token),
            ResponseContract::new(401)?.expect("products", Matcher::NotEmpty)?,
        ),
        Scenario::new(
            "products_with_invalid_token",
            Request::get("/auth/products")
                .header("Content-Type", "application/json")
                .bearer(invalid_token),
            ResponseContract::new(401)?
                .expect("message", Matcher::equals("Invalid/Expired Token!"))?,
        ),
        Scenario::new(
            "products_with_expired_token",
            Request::get("/auth/products")
                .header("Content-Type", "application/json")
                .bearer(expired_token),
            ResponseContract::new(401)?,
        ),
        Scenario::new(
            "add_product",
            Request::post("/products/add")
                .bearer(valid_token)
                .json(&json!({
                    "title": "Perfume Oil",
                    "description": "Mega Discount, Impression of A...",
                    "price": 13,
                    "discountPercentage": 8.4,
                    "rating": 4.26,
                    "stock": 65,
                    "brand": "Impression of Acqua Di Gio",
                    "category": "fragrances",
                    "thumbnail": "https://i.dummyjson.com/data/products/11/thumnail.jpg"
                })),
            ResponseContract::new(201)?
                .expect("id", Matcher::IsType(Kind::Integer))?
                .expect("title", Matcher::equals("Perfume Oil"))?
                .expect("price", Matcher::equals(13))?
                .expect("stock", Matcher::equals(65))?
                .expect("rating", Matcher::equals(4.26))?
                .expect(
                    "thumbnail",
                    Matcher::equals("https://i.dummyjson.com/data/products/11/thumnail.jpg"),
                )?
                .expect(
                    "description",
                    Matcher::equals("Mega Discount, Impression of A..."),
                )?
                .expect("brand", Matcher::equals("Impression of Acqua Di Gio"))?
                .expect("category", Matcher::equals("fragrances"))?,
        ),
        Scenario::new(
            "all_products",
            Request::get("/products").header("Content-Type", "application/json"),
            ResponseContract::new(200)?.expect("products", Matcher::NotEmpty)?,
        ),
        Scenario::new(
            "product_by_id",
            Request::get("/products/1").header("Content-Type", "application/json"),
            ResponseContract::new(200)?
                .expect("id", Matcher::equals(1))?
                .expect("title", Matcher::equals("Essence Mascara Lash Princess"))?
                .expect("price", Matcher::equals(9.99))?
                .expect("category", Matcher::equals("beauty"))?
                .expect("stock", Matcher::equals(5))?,
        ),
        Scenario::new(
            "product_by_invalid_id",
            Request::get("/products/0").header("Content-Type", "application/json"),
            ResponseContract::new(404)?
                .expect("message", Matcher::equals("Product with id '0' not found"))?,
        ),
    ];

    Ok(scenarios)
}

#[cfg(test)]
mod test {
    use super::*;
    use apicheck_core::{http::Method, Aggregator, Client, Runner};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn project() -> ProjectConfig {
        let mut project = ProjectConfig {
            name: "dummyjson".into(),
            ..Default::default()
        };
        for (key, value) in [
            ("valid_token", "valid"),
            ("invalid_token", "INVALID_TOKEN"),
            ("expired_token", "JsonWebTokenError"),
            ("login_username", "emilys"),
            ("login_password", "emilyspass"),
        ] {
            project
                .data
                .insert(key.into(), apicheck_core::config::TomlValue::String(value.into()));
        }
        project
    }

    #[test]
    fn declares_every_scenario() -> eyre::Result<()> {
        let scenarios = dummyjson(&project())?;
        let names: Vec<_> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "get_status",
                "get_users",
                "login",
                "products_with_valid_token",
                "products_with_invalid_token",
                "products_with_expired_token",
                "add_product",
                "all_products",
                "product_by_id",
                "product_by_invalid_id",
            ]
        );
        for scenario in &scenarios {
            scenario.validate()?;
        }
        Ok(())
    }

    #[test]
    fn credentials_come_from_config() -> eyre::Result<()> {
        let scenarios = dummyjson(&project())?;
        let invalid = scenarios
            .iter()
            .find(|s| s.name == "products_with_invalid_token")
            .unwrap();
        assert_eq!(invalid.request.method, Method::GET);
        assert_eq!(invalid.request.headers["authorization"], "Bearer INVALID_TOKEN");
        Ok(())
    }

    #[test]
    fn missing_credential_is_reported() {
        let mut project = project();
        project.data.remove("valid_token");
        let err = dummyjson(&project).unwrap_err();
        assert!(format!("{err:#}").contains("valid_token"));
    }

    #[test]
    fn missing_credential_names_env_variable() {
        let mut project = project();
        project.name = "dummy-json".into();
        project.data.remove("login_password");
        let err = dummyjson(&project).unwrap_err();
        assert!(format!("{err:#}").contains("APICHECK_DUMMY_JSON_LOGIN_PASSWORD"));
    }

    #[tokio::test]
    async fn login_against_mock_server() -> eyre::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/login")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::Json(
                json!({"username": "emilys", "password": "emilyspass"}),
            ))
            .with_status(200)
            .with_body(
                json!({
                    "id": 1,
                    "username": "emilys",
                    "email": "emily.johnson@x.dummyjson.com",
                    "firstName": "Emily",
                    "lastName": "Johnson",
                    "gender": "female",
                    "image": "https://dummyjson.com/icon/emilys/128",
                    "accessToken": "token"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let transport = Arc::new(Client::with_base_url(server.url())?);
        let mut runner = Runner::new(transport, Aggregator::new("dummyjson"));
        runner.add_scenarios(dummyjson(&project())?);

        let report = runner.run(&["login".to_string()]).await?;
        mock.assert_async().await;

        assert_eq!(report.scenario_results.len(), 1);
        assert!(report.scenario_results[0].overall_passed());
        Ok(())
    }
}
