use serde::{Deserialize, Serialize};

use crate::entities::courses;

#[derive(Debug, Clone, Serialize)]
pub struct Course {
    pub public_id: String,
    pub name: String,
    pub price: f64,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<courses::Model> for Course {
    fn from(model: courses::Model) -> Self {
        Self {
            public_id: model.public_id,
            name: model.name,
            price: model.price,
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseInput {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
}
