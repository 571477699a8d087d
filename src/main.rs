#[tokio::main]
async fn main() {
    color_survey::start_server().await;
}
