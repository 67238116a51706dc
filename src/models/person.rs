use serde::{Deserialize, Serialize};

use crate::entities::{professors, students};

#[derive(Debug, Clone, Serialize)]
pub struct Student {
    pub public_id: String,
    pub first_name: String,
    pub last_name: String,
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub age: Option<i32>,
    pub registration_date: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<students::Model> for Student {
    fn from(model: students::Model) -> Self {
        Self {
            public_id: model.public_id,
            first_name: model.first_name,
            last_name: model.last_name,
            national_id: model.national_id,
            phone: model.phone,
            address: model.address,
            age: model.age,
            registration_date: model.registration_date,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub age: Option<i32>,
    pub registration_date: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Professor {
    pub public_id: String,
    pub first_name: String,
    pub last_name: String,
    pub national_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub education: Option<String>,
    pub biography: Option<String>,
    pub salary_type: String,
    pub base_salary: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<professors::Model> for Professor {
    fn from(model: professors::Model) -> Self {
        Self {
            public_id: model.public_id,
            first_name: model.first_name,
            last_name: model.last_name,
            national_id: model.national_id,
            email: model.email,
            phone: model.phone,
            address: model.address,
            education: model.education,
            biography: model.biography,
            salary_type: model.salary_type,
            base_salary: model.base_salary,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfessorInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub national_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub education: Option<String>,
    pub biography: Option<String>,
    pub salary_type: Option<String>,
    pub base_salary: Option<f64>,
}
