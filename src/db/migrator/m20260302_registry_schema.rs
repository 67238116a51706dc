use crate::entities::prelude::*;
use crate::entities::{
    class_payment_plan, class_professors, class_students, classes, salary_statements,
    student_invoices,
};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(schema.create_table_from_entity(Courses).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(Classes).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(Students).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(Professors)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(ClassStudents)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(ClassProfessors)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(ClassPaymentPlan)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(StudentInvoices)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(SalaryStatements)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_class_students_pair")
                    .table(ClassStudents)
                    .col(class_students::Column::ClassId)
                    .col(class_students::Column::StudentId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_class_professors_pair")
                    .table(ClassProfessors)
                    .col(class_professors::Column::ClassId)
                    .col(class_professors::Column::ProfessorId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_class_payment_plan_month")
                    .table(ClassPaymentPlan)
                    .col(class_payment_plan::Column::ClassId)
                    .col(class_payment_plan::Column::PlanMonth)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_classes_course")
                    .table(Classes)
                    .col(classes::Column::CourseId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_student_invoices_class")
                    .table(StudentInvoices)
                    .col(student_invoices::Column::ClassId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_salary_statements_professor")
                    .table(SalaryStatements)
                    .col(salary_statements::Column::ProfessorId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SalaryStatements).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StudentInvoices).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ClassPaymentPlan).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ClassProfessors).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ClassStudents).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Professors).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Students).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Classes).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Courses).to_owned())
            .await?;

        Ok(())
    }
}
