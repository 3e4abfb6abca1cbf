use std::borrow::Cow;

use actix_web::error::{JsonPayloadError, PathError};
use actix_web::{delete, get, patch, post, put, web, HttpRequest, HttpResponse};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use validator::{validate_email, Validate, ValidationError, ValidationErrors};

use crate::error::ApiError;
use crate::store::{CommentStore, Modified};

/// Shown to the user when an email address is rejected.
pub const INVALID_EMAIL_MESSAGE: &str = "Некорректный формат email";

/// A comment as represented in the `comments` table.
///
/// `id` stays `None` until the store assigns one. Setters never revalidate;
/// call [`Validate::validate`] before handing a modified record to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate, sqlx::FromRow)]
pub struct Comment {
    id: Option<i64>,
    name: Option<String>,
    #[validate(custom = "validate_email_format")]
    email: Option<String>,
    comment: Option<String>,
}

/// Empty addresses count as absent.
fn validate_email_format(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() || validate_email(email) {
        return Ok(());
    }
    let mut err = ValidationError::new("email");
    err.message = Some(Cow::Borrowed(INVALID_EMAIL_MESSAGE));
    Err(err)
}

impl Comment {
    /// Builds an unsaved comment, rejecting a malformed email.
    pub fn create(
        name: Option<String>,
        email: Option<String>,
        comment: Option<String>,
    ) -> Result<Self, ValidationErrors> {
        let new = Comment {
            id: None,
            name,
            email,
            comment,
        };
        new.validate()?;
        Ok(new)
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn set_email(&mut self, email: Option<String>) {
        self.email = email;
    }

    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }
}

/// A request to create or change a comment. Any `id` in the body is ignored.
#[derive(Debug, Default, Deserialize)]
struct CommentReq {
    pub name: Option<String>,
    pub email: Option<String>,
    // the web client sends the text as `body`
    #[serde(alias = "body")]
    pub comment: Option<String>,
}

impl CommentReq {
    /// Overwrites only the fields present in the request.
    fn merge_into(self, comment: &mut Comment) {
        if let Some(name) = self.name {
            comment.set_name(Some(name));
        }
        if let Some(email) = self.email {
            comment.set_email(Some(email));
        }
        if let Some(text) = self.comment {
            comment.set_comment(Some(text));
        }
    }
}

fn log_rejection(e: ValidationErrors) -> ValidationErrors {
    warn!("rejected comment: {}", e);
    e
}

#[get("")]
async fn get_all_comments(store: web::Data<dyn CommentStore>) -> Result<HttpResponse, ApiError> {
    let comments = store.fetch_all().await?;
    Ok(HttpResponse::Ok().json(comments))
}

#[get("/{id}")]
async fn get_comment(
    store: web::Data<dyn CommentStore>,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    store
        .fetch_one(id)
        .await?
        .map(|comment| HttpResponse::Ok().json(comment))
        .ok_or(ApiError::NotFound(id))
}

#[post("")]
async fn post_comment(
    store: web::Data<dyn CommentStore>,
    web::Json(comment_req): web::Json<CommentReq>,
) -> Result<HttpResponse, ApiError> {
    let comment = Comment::create(comment_req.name, comment_req.email, comment_req.comment)
        .map_err(log_rejection)?;

    let created = store.insert(&comment).await?;
    info!("created comment {:?}", created.id());
    Ok(HttpResponse::Created().json(created))
}

#[put("/{id}")]
async fn put_comment(
    store: web::Data<dyn CommentStore>,
    id: web::Path<i64>,
    web::Json(comment_req): web::Json<CommentReq>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let comment = Comment::create(comment_req.name, comment_req.email, comment_req.comment)
        .map_err(log_rejection)?;

    store
        .update(id, &comment)
        .await?
        .map(|updated| HttpResponse::Ok().json(updated))
        .ok_or(ApiError::NotFound(id))
}

#[patch("/{id}")]
async fn patch_comment(
    store: web::Data<dyn CommentStore>,
    id: web::Path<i64>,
    web::Json(comment_req): web::Json<CommentReq>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let change = Box::new(move |comment: &mut Comment| {
        comment_req.merge_into(comment);
        comment.validate()
    });

    match store.modify(id, change).await? {
        Modified::Saved(updated) => Ok(HttpResponse::Ok().json(updated)),
        Modified::Rejected(e) => Err(log_rejection(e).into()),
        Modified::Missing => Err(ApiError::NotFound(id)),
    }
}

#[delete("/{id}")]
async fn delete_comment(
    store: web::Data<dyn CommentStore>,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    if store.delete(id).await? {
        info!("deleted comment {}", id);
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(ApiError::NotFound(id))
    }
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    warn!("unreadable comment body: {}", err);
    ApiError::MalformedBody(err.to_string()).into()
}

fn path_error(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadId(err.to_string()).into()
}

/// Actix configuration for comments.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/comments")
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::PathConfig::default().error_handler(path_error))
            .service(get_all_comments)
            .service(get_comment)
            .service(post_comment)
            .service(put_comment)
            .service(patch_comment)
            .service(delete_comment),
    );
}
