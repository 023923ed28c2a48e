// src/dtos/client.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AddressRequest {
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub address: Option<AddressRequest>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub address: Option<AddressRequest>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
}

#[derive(Debug, Serialize)]
pub struct ClientResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub address: AddressResponse,
    pub notes: Option<String>,
    pub status: String,
    pub created_by: i64,
    pub created_at: String,
}

impl From<crate::models::client::Client> for ClientResponse {
    fn from(client: crate::models::client::Client) -> Self {
        Self {
            id: client.id,
            name: client.name,
            email: client.email,
            company: client.company,
            phone: client.phone,
            address: AddressResponse {
                street: client.address_street,
                city: client.address_city,
                postal_code: client.address_postal_code,
                country: client.address_country,
            },
            notes: client.notes,
            status: client.status,
            created_by: client.created_by,
            created_at: client.created_at.to_rfc3339(),
        }
    }
}
