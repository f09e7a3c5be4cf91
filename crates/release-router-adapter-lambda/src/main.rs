use lambda_runtime::Error;

#[tokio::main]
async fn main() -> Result<(), Error> {
    release_router_adapter_lambda::run(include_str!("../release-router.toml")).await
}
