//! `SeaORM` implementation of the `RegistryService` trait.

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::db::repositories::class::ClassLinks;
use crate::db::{DashboardCounts, Store};
use crate::domain::{ActionKey, ActionKind, EntityKind};
use crate::entities::{courses, professors, students};
use crate::models::{
    Class, ClassInput, Course, CourseInput, Invoice, InvoiceInput, Professor, ProfessorInput,
    Report, ReportRange, Salary, SalaryInput, Student, StudentInput, non_empty,
};
use crate::services::audit::AuditService;
use crate::services::registry_service::{
    Actor, RegistryError, RegistryService, normalize_status, require_fields,
};
use crate::services::step_up::StepUpAuthorizer;

pub struct SeaOrmRegistryService {
    store: Store,
    step_up: StepUpAuthorizer,
    audit: AuditService,
}

impl SeaOrmRegistryService {
    #[must_use]
    pub fn new(store: Store, step_up: StepUpAuthorizer) -> Self {
        Self {
            audit: AuditService::new(store.clone()),
            store,
            step_up,
        }
    }

    async fn authorize(
        &self,
        actor: &Actor,
        entity: EntityKind,
        action: ActionKind,
        public_id: Option<&str>,
    ) -> Result<(), RegistryError> {
        self.step_up
            .require_pin(
                actor.admin_id,
                actor.pin(),
                ActionKey::new(entity, action),
                public_id,
            )
            .await?;
        Ok(())
    }

    async fn record(
        &self,
        actor: &Actor,
        entity: EntityKind,
        action: ActionKind,
        public_id: &str,
        description: String,
    ) {
        info!(entity = %entity, action = %action, public_id, "Registry change");
        metrics::counter!(
            "registry_mutations_total",
            "entity" => entity.as_str(),
            "action" => action.as_str()
        )
        .increment(1);

        self.audit
            .record_activity(
                Some(actor.admin_id),
                &ActionKey::new(entity, action).to_string(),
                &description,
                Some(serde_json::json!({ "public_id": public_id })),
            )
            .await;
    }

    async fn resolve_course(&self, public_id: &str) -> Result<courses::Model, RegistryError> {
        self.store
            .course_repo()
            .find(public_id.trim())
            .await?
            .ok_or(RegistryError::InvalidCourse)
    }

    /// Turns the public IDs of a class request into row references.
    /// Unknown professors and students are skipped.
    async fn resolve_links(&self, input: &ClassInput) -> Result<ClassLinks, RegistryError> {
        let professor_repo = self.store.professor_repo();
        let student_repo = self.store.student_repo();

        let add_professors = professor_repo.find_many(&input.professors).await?;
        let add_students = student_repo.find_many(&input.students).await?;
        let remove_professor_ids = professor_repo
            .find_many(&input.professors_remove)
            .await?
            .into_iter()
            .map(|p: professors::Model| p.id)
            .collect();
        let remove_student_ids = student_repo
            .find_many(&input.students_remove)
            .await?
            .into_iter()
            .map(|s: students::Model| s.id)
            .collect();

        Ok(ClassLinks {
            add_professors,
            add_students,
            remove_professor_ids,
            remove_student_ids,
            payment_plan: input.payment_plan.clone(),
        })
    }

    /// Resolves optional class and student references of an invoice.
    async fn resolve_invoice_refs(
        &self,
        input: &InvoiceInput,
    ) -> Result<(Option<i32>, Option<i32>), RegistryError> {
        let class_id = match non_empty(input.class_public_id.as_ref()) {
            Some(public_id) => Some(
                self.store
                    .class_repo()
                    .find(&public_id)
                    .await?
                    .ok_or(RegistryError::InvalidRefs)?
                    .id,
            ),
            None => None,
        };

        let student_id = match non_empty(input.student_public_id.as_ref()) {
            Some(public_id) => Some(
                self.store
                    .student_repo()
                    .find(&public_id)
                    .await?
                    .ok_or(RegistryError::InvalidRefs)?
                    .id,
            ),
            None => None,
        };

        Ok((class_id, student_id))
    }

    async fn resolve_salary_refs(
        &self,
        input: &SalaryInput,
    ) -> Result<(Option<i32>, Option<i32>), RegistryError> {
        let professor_id = match non_empty(input.professor_public_id.as_ref()) {
            Some(public_id) => Some(
                self.store
                    .professor_repo()
                    .find(&public_id)
                    .await?
                    .ok_or(RegistryError::InvalidRefs)?
                    .id,
            ),
            None => None,
        };

        let class_id = match non_empty(input.class_public_id.as_ref()) {
            Some(public_id) => Some(
                self.store
                    .class_repo()
                    .find(&public_id)
                    .await?
                    .ok_or(RegistryError::InvalidRefs)?
                    .id,
            ),
            None => None,
        };

        Ok((professor_id, class_id))
    }
}

#[async_trait]
impl RegistryService for SeaOrmRegistryService {
    async fn dashboard_counts(&self) -> Result<DashboardCounts, RegistryError> {
        Ok(self.store.dashboard_counts().await?)
    }

    async fn report(&self, range: ReportRange) -> Result<Report, RegistryError> {
        let repo = self.store.report_repo();
        Ok(Report {
            start_date: range.start.to_string(),
            end_date: range.end.to_string(),
            summary: repo.summary(&range).await?,
            financial_history: repo.financial_history(Utc::now().date_naive()).await?,
            top_courses: repo.top_courses().await?,
            overdue_invoices: repo.overdue_invoices().await?,
        })
    }

    // Courses

    async fn list_courses(&self) -> Result<Vec<Course>, RegistryError> {
        let rows = self.store.course_repo().list().await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_course(&self, actor: &Actor, input: CourseInput) -> Result<Course, RegistryError> {
        require_fields(&[("name", input.name.as_ref())])?;
        self.authorize(actor, EntityKind::Course, ActionKind::Create, None)
            .await?;

        let course = self.store.course_repo().create(&input).await?;
        self.record(
            actor,
            EntityKind::Course,
            ActionKind::Create,
            &course.public_id,
            format!("Created course {}", course.public_id),
        )
        .await;

        Ok(course.into())
    }

    async fn update_course(
        &self,
        actor: &Actor,
        public_id: &str,
        input: CourseInput,
    ) -> Result<Course, RegistryError> {
        let repo = self.store.course_repo();
        let existing = repo.find(public_id).await?.ok_or(RegistryError::NotFound)?;
        self.authorize(actor, EntityKind::Course, ActionKind::Update, Some(public_id))
            .await?;

        let course = repo.update(existing, &input).await?;
        self.record(
            actor,
            EntityKind::Course,
            ActionKind::Update,
            &course.public_id,
            format!("Updated course {}", course.public_id),
        )
        .await;

        Ok(course.into())
    }

    async fn delete_course(&self, actor: &Actor, public_id: &str) -> Result<Vec<Course>, RegistryError> {
        let repo = self.store.course_repo();
        let existing = repo.find(public_id).await?.ok_or(RegistryError::NotFound)?;
        self.authorize(actor, EntityKind::Course, ActionKind::Delete, Some(public_id))
            .await?;

        repo.delete_cascade(existing.id).await?;
        self.record(
            actor,
            EntityKind::Course,
            ActionKind::Delete,
            &existing.public_id,
            format!(
                "Deleted course {} and all associated classes",
                existing.public_id
            ),
        )
        .await;

        self.list_courses().await
    }

    // Classes

    async fn list_classes(&self) -> Result<Vec<Class>, RegistryError> {
        let repo = self.store.class_repo();
        let rows = repo.list().await?;
        Ok(repo.hydrate_all(rows).await?)
    }

    async fn get_class(&self, public_id: &str) -> Result<Class, RegistryError> {
        let repo = self.store.class_repo();
        let row = repo.find(public_id).await?.ok_or(RegistryError::NotFound)?;
        Ok(repo.hydrate(row).await?)
    }

    async fn create_class(&self, actor: &Actor, input: ClassInput) -> Result<Class, RegistryError> {
        require_fields(&[
            ("name", input.name.as_ref()),
            ("course_public_id", input.course_public_id.as_ref()),
        ])?;
        let course = self
            .resolve_course(input.course_public_id.as_deref().unwrap_or_default())
            .await?;
        self.authorize(actor, EntityKind::Class, ActionKind::Create, None)
            .await?;

        let links = self.resolve_links(&input).await?;
        let repo = self.store.class_repo();
        let class = repo.create(course.id, &input, links).await?;
        self.record(
            actor,
            EntityKind::Class,
            ActionKind::Create,
            &class.public_id,
            format!("Created class {} for course {}", class.public_id, course.public_id),
        )
        .await;

        Ok(repo.hydrate(class).await?)
    }

    async fn update_class(
        &self,
        actor: &Actor,
        public_id: &str,
        input: ClassInput,
    ) -> Result<Class, RegistryError> {
        let repo = self.store.class_repo();
        let existing = repo.find(public_id).await?.ok_or(RegistryError::NotFound)?;

        let course_id = match non_empty(input.course_public_id.as_ref()) {
            Some(course_public_id) => Some(self.resolve_course(&course_public_id).await?.id),
            None => None,
        };
        self.authorize(actor, EntityKind::Class, ActionKind::Update, Some(public_id))
            .await?;

        let links = self.resolve_links(&input).await?;
        let class = repo.update(existing, course_id, &input, links).await?;
        self.record(
            actor,
            EntityKind::Class,
            ActionKind::Update,
            &class.public_id,
            format!("Updated class {}", class.public_id),
        )
        .await;

        Ok(repo.hydrate(class).await?)
    }

    async fn delete_class(&self, actor: &Actor, public_id: &str) -> Result<Vec<Class>, RegistryError> {
        let repo = self.store.class_repo();
        let existing = repo.find(public_id).await?.ok_or(RegistryError::NotFound)?;
        self.authorize(actor, EntityKind::Class, ActionKind::Delete, Some(public_id))
            .await?;

        repo.delete_cascade(existing.id).await?;
        self.record(
            actor,
            EntityKind::Class,
            ActionKind::Delete,
            &existing.public_id,
            format!(
                "Deleted class {} with its enrollments and billing",
                existing.public_id
            ),
        )
        .await;

        self.list_classes().await
    }

    // Students

    async fn list_students(&self) -> Result<Vec<Student>, RegistryError> {
        let rows = self.store.student_repo().list().await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_student(&self, actor: &Actor, input: StudentInput) -> Result<Student, RegistryError> {
        require_fields(&[
            ("first_name", input.first_name.as_ref()),
            ("last_name", input.last_name.as_ref()),
        ])?;
        self.authorize(actor, EntityKind::Student, ActionKind::Create, None)
            .await?;

        let student = self.store.student_repo().create(&input).await?;
        self.record(
            actor,
            EntityKind::Student,
            ActionKind::Create,
            &student.public_id,
            format!("Created student {}", student.public_id),
        )
        .await;

        Ok(student.into())
    }

    async fn update_student(
        &self,
        actor: &Actor,
        public_id: &str,
        input: StudentInput,
    ) -> Result<Student, RegistryError> {
        let repo = self.store.student_repo();
        let existing = repo.find(public_id).await?.ok_or(RegistryError::NotFound)?;
        self.authorize(actor, EntityKind::Student, ActionKind::Update, Some(public_id))
            .await?;

        let student = repo.update(existing, &input).await?;
        self.record(
            actor,
            EntityKind::Student,
            ActionKind::Update,
            &student.public_id,
            format!("Updated student {}", student.public_id),
        )
        .await;

        Ok(student.into())
    }

    async fn delete_student(&self, actor: &Actor, public_id: &str) -> Result<Vec<Student>, RegistryError> {
        let repo = self.store.student_repo();
        let existing = repo.find(public_id).await?.ok_or(RegistryError::NotFound)?;
        self.authorize(actor, EntityKind::Student, ActionKind::Delete, Some(public_id))
            .await?;

        repo.delete_cascade(existing.id).await?;
        self.record(
            actor,
            EntityKind::Student,
            ActionKind::Delete,
            &existing.public_id,
            format!(
                "Deleted student {} with enrollments and invoices",
                existing.public_id
            ),
        )
        .await;

        self.list_students().await
    }

    // Professors

    async fn list_professors(&self) -> Result<Vec<Professor>, RegistryError> {
        let rows = self.store.professor_repo().list().await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_professor(
        &self,
        actor: &Actor,
        input: ProfessorInput,
    ) -> Result<Professor, RegistryError> {
        require_fields(&[
            ("first_name", input.first_name.as_ref()),
            ("last_name", input.last_name.as_ref()),
        ])?;
        self.authorize(actor, EntityKind::Professor, ActionKind::Create, None)
            .await?;

        let professor = self.store.professor_repo().create(&input).await?;
        self.record(
            actor,
            EntityKind::Professor,
            ActionKind::Create,
            &professor.public_id,
            format!("Created professor {}", professor.public_id),
        )
        .await;

        Ok(professor.into())
    }

    async fn update_professor(
        &self,
        actor: &Actor,
        public_id: &str,
        input: ProfessorInput,
    ) -> Result<Professor, RegistryError> {
        let repo = self.store.professor_repo();
        let existing = repo.find(public_id).await?.ok_or(RegistryError::NotFound)?;
        self.authorize(actor, EntityKind::Professor, ActionKind::Update, Some(public_id))
            .await?;

        let professor = repo.update(existing, &input).await?;
        self.record(
            actor,
            EntityKind::Professor,
            ActionKind::Update,
            &professor.public_id,
            format!("Updated professor {}", professor.public_id),
        )
        .await;

        Ok(professor.into())
    }

    async fn delete_professor(
        &self,
        actor: &Actor,
        public_id: &str,
    ) -> Result<Vec<Professor>, RegistryError> {
        let repo = self.store.professor_repo();
        let existing = repo.find(public_id).await?.ok_or(RegistryError::NotFound)?;
        self.authorize(actor, EntityKind::Professor, ActionKind::Delete, Some(public_id))
            .await?;

        repo.delete_cascade(existing.id).await?;
        self.record(
            actor,
            EntityKind::Professor,
            ActionKind::Delete,
            &existing.public_id,
            format!(
                "Deleted professor {} with class assignments and salaries",
                existing.public_id
            ),
        )
        .await;

        self.list_professors().await
    }

    // Invoices

    async fn list_invoices(&self) -> Result<Vec<Invoice>, RegistryError> {
        Ok(self.store.invoice_repo().list().await?)
    }

    async fn create_invoice(
        &self,
        actor: &Actor,
        mut input: InvoiceInput,
    ) -> Result<Invoice, RegistryError> {
        require_fields(&[
            ("class_public_id", input.class_public_id.as_ref()),
            ("student_public_id", input.student_public_id.as_ref()),
        ])?;
        normalize_status(&mut input.status)?;
        let (Some(class_id), Some(student_id)) = self.resolve_invoice_refs(&input).await? else {
            return Err(RegistryError::InvalidRefs);
        };
        self.authorize(actor, EntityKind::Invoice, ActionKind::Create, None)
            .await?;

        let repo = self.store.invoice_repo();
        let invoice = repo
            .create(class_id, student_id, &input, actor.admin_id)
            .await?;
        self.record(
            actor,
            EntityKind::Invoice,
            ActionKind::Create,
            &invoice.public_id,
            format!("Created invoice {}", invoice.public_id),
        )
        .await;

        Ok(repo.project_one(invoice).await?)
    }

    async fn update_invoice(
        &self,
        actor: &Actor,
        public_id: &str,
        mut input: InvoiceInput,
    ) -> Result<Invoice, RegistryError> {
        let repo = self.store.invoice_repo();
        let existing = repo.find(public_id).await?.ok_or(RegistryError::NotFound)?;
        normalize_status(&mut input.status)?;
        let refs = self.resolve_invoice_refs(&input).await?;
        self.authorize(actor, EntityKind::Invoice, ActionKind::Update, Some(public_id))
            .await?;

        let invoice = repo.update(existing, refs, &input, actor.admin_id).await?;
        self.record(
            actor,
            EntityKind::Invoice,
            ActionKind::Update,
            &invoice.public_id,
            format!("Updated invoice {}", invoice.public_id),
        )
        .await;

        Ok(repo.project_one(invoice).await?)
    }

    async fn delete_invoice(&self, actor: &Actor, public_id: &str) -> Result<Vec<Invoice>, RegistryError> {
        let repo = self.store.invoice_repo();
        let existing = repo.find(public_id).await?.ok_or(RegistryError::NotFound)?;
        self.authorize(actor, EntityKind::Invoice, ActionKind::Delete, Some(public_id))
            .await?;

        repo.delete(existing.id).await?;
        self.record(
            actor,
            EntityKind::Invoice,
            ActionKind::Delete,
            &existing.public_id,
            format!("Deleted invoice {}", existing.public_id),
        )
        .await;

        self.list_invoices().await
    }

    // Salaries

    async fn list_salaries(&self) -> Result<Vec<Salary>, RegistryError> {
        Ok(self.store.salary_repo().list().await?)
    }

    async fn create_salary(
        &self,
        actor: &Actor,
        mut input: SalaryInput,
    ) -> Result<Salary, RegistryError> {
        require_fields(&[("professor_public_id", input.professor_public_id.as_ref())])?;
        normalize_status(&mut input.status)?;
        let (Some(professor_id), class_id) = self.resolve_salary_refs(&input).await? else {
            return Err(RegistryError::InvalidRefs);
        };
        self.authorize(actor, EntityKind::Salary, ActionKind::Create, None)
            .await?;

        let repo = self.store.salary_repo();
        let salary = repo
            .create(professor_id, class_id, &input, actor.admin_id)
            .await?;
        self.record(
            actor,
            EntityKind::Salary,
            ActionKind::Create,
            &salary.public_id,
            format!("Created salary statement {}", salary.public_id),
        )
        .await;

        Ok(repo.project_one(salary).await?)
    }

    async fn update_salary(
        &self,
        actor: &Actor,
        public_id: &str,
        mut input: SalaryInput,
    ) -> Result<Salary, RegistryError> {
        let repo = self.store.salary_repo();
        let existing = repo.find(public_id).await?.ok_or(RegistryError::NotFound)?;
        normalize_status(&mut input.status)?;
        let (_, class_id) = self.resolve_salary_refs(&input).await?;
        self.authorize(actor, EntityKind::Salary, ActionKind::Update, Some(public_id))
            .await?;

        let salary = repo.update(existing, class_id, &input, actor.admin_id).await?;
        self.record(
            actor,
            EntityKind::Salary,
            ActionKind::Update,
            &salary.public_id,
            format!("Updated salary statement {}", salary.public_id),
        )
        .await;

        Ok(repo.project_one(salary).await?)
    }

    async fn delete_salary(&self, actor: &Actor, public_id: &str) -> Result<Vec<Salary>, RegistryError> {
        let repo = self.store.salary_repo();
        let existing = repo.find(public_id).await?.ok_or(RegistryError::NotFound)?;
        self.authorize(actor, EntityKind::Salary, ActionKind::Delete, Some(public_id))
            .await?;

        repo.delete(existing.id).await?;
        self.record(
            actor,
            EntityKind::Salary,
            ActionKind::Delete,
            &existing.public_id,
            format!("Deleted salary statement {}", existing.public_id),
        )
        .await;

        self.list_salaries().await
    }
}
