//! Fetching and posting against a public JSON API.
//!
//! This example shows how to:
//! - Describe an API as an `Endpoint` enum
//! - Send JSON bodies and query parameters
//! - Inspect the resolved `Outcome` and the response metadata
//!
//! Run with: `cargo run --example basic_fetch`

use flowline::params::Parameters;
use flowline::{Client, Endpoint, HttpMethod, Json, Outcome, Task};
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

enum Placeholder {
    Post(u32),
    PostsByUser(u32),
    CreatePost(NewPost),
}

impl Endpoint for Placeholder {
    fn base_url(&self) -> &str {
        "https://jsonplaceholder.typicode.com"
    }

    fn path(&self) -> String {
        match self {
            Placeholder::Post(id) => format!("/posts/{}", id),
            Placeholder::PostsByUser(_) | Placeholder::CreatePost(_) => "/posts".to_string(),
        }
    }

    fn method(&self) -> HttpMethod {
        match self {
            Placeholder::CreatePost(_) => HttpMethod::Post,
            _ => HttpMethod::Get,
        }
    }

    fn task(&self) -> Task {
        match self {
            Placeholder::Post(_) => Task::Plain,
            Placeholder::PostsByUser(user) => Task::query(Parameters::new().with("userId", *user)),
            Placeholder::CreatePost(post) => Task::json(NewPost {
                title: post.title.clone(),
                body: post.body.clone(),
                user_id: post.user_id,
            }),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("flowline=debug,basic_fetch=info")
        .init();

    let client = Client::builder().build()?;

    println!("=== GET ===");
    let response = client.fetch_json::<Post>(&Placeholder::Post(1)).await?;
    println!("Status: {:?}, latency: {:?}", response.status, response.latency);
    match &response.data {
        Outcome::Success(post) => println!("Post {}: {}", post.id, post.title),
        other => println!("Unexpected outcome: {}", other.kind()),
    }
    println!();

    println!("=== GET with query ===");
    let posts = client
        .fetch_json::<Vec<Post>>(&Placeholder::PostsByUser(1))
        .await?
        .into_result()?;
    println!("User 1 wrote {} posts", posts.data.len());
    println!();

    println!("=== POST ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };
    let created = client
        .fetch_json::<Post>(&Placeholder::CreatePost(new_post))
        .await?
        .into_result()?;
    println!("Created post {} ({:?})", created.data.id, created.status);

    Ok(())
}
