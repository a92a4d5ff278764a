#[tokio::main]
async fn main() {
    plex_rich_presence_lib::run().await;
}
