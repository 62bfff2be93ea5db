pub mod error;
pub mod models;
pub mod routes;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{settings::StoreSettings, InitCtx, Module};
use bookshelf_store::JsonFileStore;
use serde_json::json;

use models::Library;
use service::BookService;

/// Book collection backed by a single JSON document
pub struct BooksModule {
    service: Arc<BookService>,
    file_store: Option<Arc<JsonFileStore>>,
}

impl BooksModule {
    /// Module over the JSON file named in `settings`
    pub fn from_settings(settings: &StoreSettings) -> Self {
        let file_store = Arc::new(JsonFileStore::new(&settings.path));
        let service = BookService::new(file_store.clone(), settings.serialize_writes);
        Self {
            service: Arc::new(service),
            file_store: Some(file_store),
        }
    }

    /// Module over an already-built service, for embedding with another store
    pub fn with_service(service: Arc<BookService>) -> Self {
        Self {
            service,
            file_store: None,
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if let Some(store) = &self.file_store {
            if ctx.settings.store.create_if_missing {
                store.ensure_exists(&Library::default()).await?;
            }
            tracing::info!(
                module = self.name(),
                path = %store.path().display(),
                serialize_writes = ctx.settings.store.serialize_writes,
                "books module initialized"
            );
        }
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create the books module from store settings
pub fn create_module(settings: &StoreSettings) -> Arc<dyn Module> {
    Arc::new(BooksModule::from_settings(settings))
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn book_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let text = json!({ "type": "string" });
    let book_id_param = json!({
        "name": "bookId",
        "in": "path",
        "required": true,
        "schema": { "type": "string" }
    });
    let filter_param = |name: &str| {
        json!({
            "name": name,
            "in": "query",
            "required": false,
            "schema": { "type": "string" }
        })
    };

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "parameters": [
                        { "name": "page", "in": "query", "required": false, "schema": { "type": "integer", "minimum": 1, "default": 1 } },
                        { "name": "limit", "in": "query", "required": false, "schema": { "type": "integer", "minimum": 1, "default": 10 } },
                        filter_param("author"),
                        filter_param("country"),
                        filter_param("title"),
                        filter_param("language")
                    ],
                    "responses": {
                        "200": {
                            "description": "Page of books",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            }
                        },
                        "401": error_response("Query field not allowed")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/CreateBook" }
                            }
                        }
                    },
                    "responses": {
                        "200": book_response("Created book"),
                        "401": error_response("Missing body info")
                    }
                }
            },
            "/{bookId}": {
                "put": {
                    "summary": "Update a book",
                    "tags": ["Books"],
                    "parameters": [book_id_param.clone()],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/UpdateBook" }
                            }
                        }
                    },
                    "responses": {
                        "200": book_response("Updated book"),
                        "401": error_response("Update field not allowed"),
                        "404": error_response("Book not found")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [book_id_param],
                    "responses": {
                        "200": {
                            "description": "Deleted",
                            "content": {
                                "application/json": { "schema": { "type": "object" } }
                            }
                        },
                        "404": error_response("Book not found")
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Books health check",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": { "text/plain": { "schema": { "type": "string" } } }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "description": "Generated hex identifier" },
                        "author": text,
                        "country": text,
                        "imageLink": text,
                        "language": text,
                        "link": text,
                        "pages": { "type": "integer" },
                        "title": text,
                        "year": { "type": "integer" }
                    },
                    "required": ["id", "author", "country", "imageLink", "language", "link", "pages", "title", "year"]
                },
                "CreateBook": {
                    "type": "object",
                    "properties": {
                        "author": text,
                        "country": text,
                        "imageLink": text,
                        "language": text,
                        "link": text,
                        "pages": { "type": "integer" },
                        "title": text,
                        "year": { "type": "integer" }
                    },
                    "required": ["author", "country", "imageLink", "language", "link", "pages", "title", "year"]
                },
                "UpdateBook": {
                    "type": "object",
                    "properties": {
                        "author": text,
                        "country": text,
                        "imageLink": text,
                        "language": text,
                        "pages": {},
                        "title": text,
                        "year": {}
                    },
                    "additionalProperties": false
                }
            }
        }
    })
}
