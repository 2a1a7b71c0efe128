use docgen::db::Database;
use docgen::models::*;
use speculate2::speculate;
use uuid::Uuid;

fn create_test_user(db: &Database, email: &str) -> User {
    db.create_user(email, "$argon2id$test")
        .expect("Failed to create user")
        .expect("Email already taken")
}

fn create_test_project(db: &Database, user: &User, outline: &[&str]) -> ProjectWithSections {
    db.create_project(
        user.id,
        CreateProjectInput {
            title: "Q1 Plan".to_string(),
            doc_type: DocType::Report,
            context: "formal tone".to_string(),
            outline: outline.iter().map(|s| s.to_string()).collect(),
        },
    )
    .expect("Failed to create project")
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "users" {
        describe "create_user" {
            it "stores the email and hash" {
                let user = create_test_user(&db, "ann@example.com");
                let found = db.get_user_by_email("ann@example.com").expect("Query failed").unwrap();

                assert_eq!(found.id, user.id);
                assert_eq!(found.password_hash, "$argon2id$test");
            }

            it "returns None for a duplicate email" {
                create_test_user(&db, "ann@example.com");
                let second = db.create_user("ann@example.com", "other").expect("Query failed");

                assert!(second.is_none());
            }
        }

        describe "get_user_by_email" {
            it "returns None for an unknown email" {
                assert!(db.get_user_by_email("nobody@example.com").expect("Query failed").is_none());
            }
        }
    }

    describe "projects" {
        describe "create_project" {
            it "creates one pending section per outline heading" {
                let user = create_test_user(&db, "ann@example.com");
                let created = create_test_project(&db, &user, &["Intro", "Budget", "Risks"]);

                let stored = db.get_sections(created.project.id).expect("Query failed");
                let orders: Vec<i64> = stored.iter().map(|s| s.order).collect();
                let headings: Vec<&str> = stored.iter().map(|s| s.heading.as_str()).collect();

                assert_eq!(orders, vec![0, 1, 2]);
                assert_eq!(headings, vec!["Intro", "Budget", "Risks"]);
                assert!(stored.iter().all(|s| s.content == PENDING_CONTENT));
                assert!(stored.iter().all(|s| s.state == SectionState::Pending));
                assert!(stored.iter().all(|s| s.feedback == FeedbackTag::None));
            }

            it "accepts an empty outline" {
                let user = create_test_user(&db, "ann@example.com");
                let created = create_test_project(&db, &user, &[]);

                assert!(created.sections.is_empty());
                assert!(db.get_project(created.project.id).expect("Query failed").is_some());
            }

            it "keeps the doc type" {
                let user = create_test_user(&db, "ann@example.com");
                let created = db.create_project(user.id, CreateProjectInput {
                    title: "Deck".to_string(),
                    doc_type: DocType::Slides,
                    context: String::new(),
                    outline: vec!["One".to_string()],
                }).expect("Failed to create");

                let found = db.get_project(created.project.id).expect("Query failed").unwrap();
                assert_eq!(found.doc_type, DocType::Slides);
                assert_eq!(found.context, "");
            }
        }

        describe "get_projects_for_user" {
            it "returns only the caller's projects with sections" {
                let ann = create_test_user(&db, "ann@example.com");
                let bob = create_test_user(&db, "bob@example.com");
                create_test_project(&db, &ann, &["A", "B"]);
                create_test_project(&db, &bob, &["C"]);

                let projects = db.get_projects_for_user(ann.id).expect("Query failed");

                assert_eq!(projects.len(), 1);
                assert_eq!(projects[0].project.user_id, ann.id);
                assert_eq!(projects[0].sections.len(), 2);
            }
        }

        describe "get_project_for_user" {
            it "hides projects owned by someone else" {
                let ann = create_test_user(&db, "ann@example.com");
                let bob = create_test_user(&db, "bob@example.com");
                let created = create_test_project(&db, &ann, &["A"]);

                assert!(db.get_project_for_user(created.project.id, ann.id).expect("Query failed").is_some());
                assert!(db.get_project_for_user(created.project.id, bob.id).expect("Query failed").is_none());
            }
        }

        describe "delete_project" {
            it "removes the project and its sections" {
                let user = create_test_user(&db, "ann@example.com");
                let created = create_test_project(&db, &user, &["A", "B"]);
                let section_id = created.sections[0].id;

                assert!(db.delete_project(created.project.id, user.id).expect("Delete failed"));
                assert!(db.get_project(created.project.id).expect("Query failed").is_none());
                assert!(db.get_section(section_id).expect("Query failed").is_none());
            }

            it "refuses to delete another user's project" {
                let ann = create_test_user(&db, "ann@example.com");
                let bob = create_test_user(&db, "bob@example.com");
                let created = create_test_project(&db, &ann, &["A"]);

                assert!(!db.delete_project(created.project.id, bob.id).expect("Delete failed"));
                assert!(db.get_project(created.project.id).expect("Query failed").is_some());
            }

            it "returns false for a missing project" {
                let user = create_test_user(&db, "ann@example.com");
                assert!(!db.delete_project(Uuid::new_v4(), user.id).expect("Delete failed"));
            }
        }
    }

    describe "sections" {
        describe "set_section_content_by_order" {
            it "updates only the section at that order" {
                let user = create_test_user(&db, "ann@example.com");
                let created = create_test_project(&db, &user, &["A", "B", "C"]);

                assert!(db.set_section_content_by_order(created.project.id, 1, "Middle.").expect("Update failed"));

                let contents: Vec<String> = db
                    .get_sections(created.project.id)
                    .expect("Query failed")
                    .into_iter()
                    .map(|s| s.content)
                    .collect();
                assert_eq!(contents, vec![PENDING_CONTENT, "Middle.", PENDING_CONTENT]);
            }

            it "returns false when the order does not exist" {
                let user = create_test_user(&db, "ann@example.com");
                let created = create_test_project(&db, &user, &["A"]);

                assert!(!db.set_section_content_by_order(created.project.id, 5, "x").expect("Update failed"));
            }
        }

        describe "set_section_content" {
            it "derives the failed state from the sentinel" {
                let user = create_test_user(&db, "ann@example.com");
                let created = create_test_project(&db, &user, &["A"]);
                let id = created.sections[0].id;

                db.set_section_content(id, FAILED_CONTENT).expect("Update failed");

                let section = db.get_section(id).expect("Query failed").unwrap();
                assert_eq!(section.state, SectionState::Failed);
            }
        }

        describe "set_section_feedback" {
            it "stores the tag and comment" {
                let user = create_test_user(&db, "ann@example.com");
                let created = create_test_project(&db, &user, &["A"]);
                let id = created.sections[0].id;

                assert!(db.set_section_feedback(id, &FeedbackTag::Approved, "Looks good").expect("Update failed"));

                let section = db.get_section(id).expect("Query failed").unwrap();
                assert_eq!(section.feedback, FeedbackTag::Approved);
                assert_eq!(section.comments, "Looks good");
            }

            it "keeps unknown tags verbatim" {
                let user = create_test_user(&db, "ann@example.com");
                let created = create_test_project(&db, &user, &["A"]);
                let id = created.sections[0].id;

                db.set_section_feedback(id, &FeedbackTag::Other("needs-data".to_string()), "").expect("Update failed");

                let section = db.get_section(id).expect("Query failed").unwrap();
                assert_eq!(section.feedback, FeedbackTag::Other("needs-data".to_string()));
            }

            it "returns false for a missing section" {
                assert!(!db.set_section_feedback(Uuid::new_v4(), &FeedbackTag::Rejected, "").expect("Update failed"));
            }
        }
    }
}

#[test]
fn data_survives_reopening_an_on_disk_database() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("docgen.db");

    let project_id = {
        let db = Database::open(path.clone()).expect("Failed to open database");
        db.migrate().expect("Failed to run migrations");
        let user = create_test_user(&db, "ann@example.com");
        create_test_project(&db, &user, &["A", "B"]).project.id
    };

    let db = Database::open(path).expect("Failed to reopen database");
    db.migrate().expect("Migrations should be idempotent");
    let sections = db.get_sections(project_id).expect("Query failed");
    assert_eq!(sections.len(), 2);
}
