#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    iot_iam_sync::run().await;
}
