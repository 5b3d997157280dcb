//! Basic example demonstrating typed GET and POST calls.
//!
//! This example shows how to:
//! - Create a client from options
//! - Build a query string from a struct
//! - Read a nested subtree of the response with a result path
//! - Access response data and metadata
//!
//! Run with: `cargo run --example basic_call`

use reqtry::{ApiOptions, Client, Error, RequestMetadata};
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
struct PostFilter {
    #[serde(rename = "userId")]
    user_id: u32,
    #[serde(rename = "_limit")]
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
    tags: Option<Vec<String>>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("reqtry=debug,basic_call=info")
        .init();

    let options = ApiOptions {
        retry_count: 2,
        delay: 250,
        ..ApiOptions::new("https://jsonplaceholder.typicode.com")
    };
    let client = Client::new(options);

    println!("=== GET with query ===");
    let filter = PostFilter {
        user_id: 1,
        limit: Some(2),
    };
    println!("URL: {}", client.api_url_with_query("posts", &filter)?);

    let metadata = RequestMetadata::get("posts").with_query(&filter)?;
    let posts = client.call::<(), Vec<Post>>(metadata, None).await?;
    for post in posts.iter() {
        println!("#{} {}", post.id, post.title);
    }
    println!();

    println!("=== Result path ===");
    let metadata = RequestMetadata::get("posts/1").with_result_path("title");
    let title = client.call::<(), String>(metadata, None).await?;
    println!("Title only: {}", title.data);
    println!();

    println!("=== POST ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
        tags: None,
    };
    let response = client.post::<_, Post>("posts", &new_post).await?;

    println!("Created post ID: {}", response.data.id);
    println!("Request latency: {:?}", response.latency);
    println!("Raw response length: {} bytes", response.raw_body.len());
    println!("Content-Type: {:?}", response.header("content-type"));
    println!("Attempts: {}", response.attempts);

    Ok(())
}
