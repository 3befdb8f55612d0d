//! Basic example demonstrating verb calls with a merged base configuration.
//!
//! This example shows how to:
//! - Create a client with a base URL and default headers
//! - Make GET requests with per-call query parameters
//! - Make POST requests with a JSON body
//! - Access response data and metadata
//!
//! Run with: `cargo run --example basic_call`

use endpointer::{Client, Error, RequestConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("endpointer=debug,basic_call=info")
        .init();

    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .default_header("accept", "application/json")?
        .build()?;

    println!("=== GET Request Example ===");
    let response = client.get::<Post>("/posts/1", None).await?;

    println!("Post ID: {}", response.data.id);
    println!("Title: {}", response.data.title);
    println!("Request latency: {:?}", response.latency);
    println!("Status code: {}", response.status);
    println!();

    println!("=== GET With Query Parameters ===");
    let posts = client
        .get::<Vec<Post>>("/posts", Some(RequestConfig::new().with_param("userId", 1)))
        .await?;
    println!("User 1 has {} posts", posts.data.len());
    println!();

    println!("=== POST Request Example ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };

    let response = client.post::<_, Post>("/posts", Some(&new_post), None).await?;

    println!("Created post ID: {}", response.data.id);
    println!("Raw response length: {} bytes", response.raw_body.len());
    println!("Content-Type: {:?}", response.header("content-type"));

    Ok(())
}
