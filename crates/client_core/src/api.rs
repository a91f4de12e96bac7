//! Maps intents onto backend endpoints.

use shared::protocol::Intent;

use crate::transport::{Method, RequestParams};

pub fn request_for(intent: &Intent, per_page: u32) -> RequestParams {
    match intent {
        Intent::Find {
            interface,
            term,
            page,
        } => {
            let params = RequestParams::new(Method::Get, format!("api/{interface}"))
                .with_query("page", page)
                .with_query("per_page", per_page);
            match term.as_deref().filter(|term| !term.is_empty()) {
                Some(term) => params.with_query("find", term),
                None => params,
            }
        }
        Intent::Get { interface, id } => {
            RequestParams::new(Method::Get, format!("api/{interface}/{id}"))
        }
        Intent::Create { interface, body } => {
            RequestParams::new(Method::Post, format!("api/{interface}")).with_body(body.clone())
        }
        Intent::Edit {
            interface,
            id,
            body,
        } => RequestParams::new(Method::Patch, format!("api/{interface}/{id}"))
            .with_body(body.clone()),
        Intent::Remove { interface, id } => {
            RequestParams::new(Method::Delete, format!("api/{interface}/{id}"))
        }
    }
}
