//! Example describing calls as route templates plus a parameter bag.
//!
//! Run with: `cargo run --example endpoint_shorthand`

use endpointer::{parse_endpoint, Client, EndpointRequest, Error};
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("endpointer=debug,endpoint_shorthand=info")
        .init();

    // Parsing alone shows how the bag is split up.
    let request = EndpointRequest::new()
        .with_param("postId", 1)
        .with_param("fields", "title")
        .with_param("title", "Updated title");
    let config = parse_endpoint("PATCH /posts/{postId}{?fields}", &request)?;
    println!(
        "Parsed: {}",
        serde_json::to_string_pretty(&config).unwrap_or_default()
    );

    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .build()?
        .into_data_client();

    // Leftover fields of a GET become the query string.
    let comments: Vec<Value> = client
        .endpoint("GET /comments", EndpointRequest::new().with_param("postId", 1))
        .await?;
    println!("Post 1 has {} comments", comments.len());

    // Leftover fields of a PATCH become the JSON body.
    let updated: Value = client.endpoint("PATCH /posts/{postId}{?fields}", request).await?;
    println!("Updated: {}", updated);

    // `data` replaces the body wholesale.
    let created: Value = client
        .endpoint(
            "POST /posts",
            EndpointRequest::new().with_data(json!({"title": "Hello", "userId": 1})),
        )
        .await?;
    println!("Created: {}", created);

    Ok(())
}
