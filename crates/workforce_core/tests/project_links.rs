use std::collections::BTreeSet;
use workforce_core::{
    EmployeeService, ProjectService, ReferencePolicy, RepoError, Store, StoreConfig,
};
use workforce_core::model::association::EntityKind;

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

fn employee_project_ids(store: &Store, employee_id: i64) -> Vec<i64> {
    EmployeeService::new(store)
        .load_employee_graph(employee_id)
        .unwrap()
        .unwrap()
        .project_ids()
}

fn project_employee_ids(store: &Store, project_id: i64) -> BTreeSet<i64> {
    ProjectService::new(store)
        .load_project_graph(project_id)
        .unwrap()
        .unwrap()
        .employees()
        .filter_map(|employee| employee.id)
        .collect()
}

struct Fixture {
    employee: i64,
    p1: i64,
    p2: i64,
    p3: i64,
}

fn fixture(store: &Store) -> Fixture {
    let employees = EmployeeService::new(store);
    let projects = ProjectService::new(store);
    Fixture {
        employee: employees.add_employee("Joan", "Garcia", 35000).unwrap().id.unwrap(),
        p1: projects.add_project("P1", "first", "ACTIU").unwrap().id.unwrap(),
        p2: projects.add_project("P2", "second", "ACTIU").unwrap().id.unwrap(),
        p3: projects.add_project("P3", "third", "PLANIFICAT").unwrap().id.unwrap(),
    }
}

#[test]
fn replace_touches_only_the_symmetric_difference() {
    let store = store();
    let f = fixture(&store);
    let projects = ProjectService::new(&store);

    projects.replace_project_links(f.employee, &[f.p1, f.p2]).unwrap();
    let outcome = projects
        .replace_project_links(f.employee, &[f.p2, f.p3])
        .unwrap()
        .unwrap();

    assert_eq!(outcome.added, vec![f.p3]);
    assert_eq!(outcome.removed, vec![f.p1]);
    assert_eq!(outcome.retained, vec![f.p2]);
    assert!(outcome.skipped.is_empty());

    assert_eq!(employee_project_ids(&store, f.employee), vec![f.p2, f.p3]);
    assert!(project_employee_ids(&store, f.p1).is_empty());
    assert_eq!(project_employee_ids(&store, f.p2), BTreeSet::from([f.employee]));
    assert_eq!(project_employee_ids(&store, f.p3), BTreeSet::from([f.employee]));
}

#[test]
fn replacing_twice_with_the_same_set_is_idempotent() {
    let store = store();
    let f = fixture(&store);
    let projects = ProjectService::new(&store);

    projects.replace_project_links(f.employee, &[f.p1, f.p3]).unwrap();
    let first = employee_project_ids(&store, f.employee);
    let second_outcome = projects
        .replace_project_links(f.employee, &[f.p3, f.p1, f.p1])
        .unwrap()
        .unwrap();

    assert!(second_outcome.is_unchanged());
    assert_eq!(employee_project_ids(&store, f.employee), first);
}

#[test]
fn replace_for_a_missing_employee_reports_none() {
    let store = store();
    let f = fixture(&store);
    let outcome = ProjectService::new(&store)
        .replace_project_links(404, &[f.p1])
        .unwrap();
    assert!(outcome.is_none());
    assert!(project_employee_ids(&store, f.p1).is_empty());
}

#[test]
fn unknown_project_ids_are_skipped_by_default() {
    let store = store();
    let f = fixture(&store);

    let outcome = ProjectService::new(&store)
        .replace_project_links(f.employee, &[f.p1, 999])
        .unwrap()
        .unwrap();

    assert_eq!(outcome.added, vec![f.p1]);
    assert_eq!(outcome.skipped, vec![999]);
    assert_eq!(employee_project_ids(&store, f.employee), vec![f.p1]);
}

#[test]
fn reject_policy_fails_and_rolls_back_the_whole_replace() {
    let store = Store::open(&StoreConfig::in_memory().with_reference_policy(ReferencePolicy::Reject))
        .unwrap();
    let f = fixture(&store);
    let projects = ProjectService::new(&store);
    projects.replace_project_links(f.employee, &[f.p1]).unwrap();

    let err = projects
        .replace_project_links(f.employee, &[f.p2, 999])
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::InvalidReference {
            kind: EntityKind::Project,
            id: 999
        }
    ));

    assert_eq!(employee_project_ids(&store, f.employee), vec![f.p1]);
}

#[test]
fn link_and_unlink_are_idempotent() {
    let store = store();
    let f = fixture(&store);
    let projects = ProjectService::new(&store);

    assert_eq!(projects.link_project(f.employee, f.p1).unwrap(), Some(true));
    assert_eq!(projects.link_project(f.employee, f.p1).unwrap(), Some(false));
    assert_eq!(project_employee_ids(&store, f.p1), BTreeSet::from([f.employee]));

    assert_eq!(projects.unlink_project(f.employee, f.p1).unwrap(), Some(true));
    assert_eq!(projects.unlink_project(f.employee, f.p1).unwrap(), Some(false));
    assert!(project_employee_ids(&store, f.p1).is_empty());

    assert_eq!(projects.link_project(f.employee, 404).unwrap(), None);
    assert_eq!(projects.unlink_project(404, f.p1).unwrap(), None);
}

#[test]
fn deleting_a_project_decouples_without_touching_employees() {
    let store = store();
    let f = fixture(&store);
    let employees = EmployeeService::new(&store);
    let projects = ProjectService::new(&store);
    let other = employees.add_employee("Laia", "Puig", 45000).unwrap().id.unwrap();

    projects.replace_project_links(f.employee, &[f.p1, f.p2]).unwrap();
    projects.replace_project_links(other, &[f.p1]).unwrap();

    assert!(projects.delete_project(f.p1).unwrap());
    assert!(!projects.delete_project(f.p1).unwrap());

    assert_eq!(employee_project_ids(&store, f.employee), vec![f.p2]);
    assert!(employee_project_ids(&store, other).is_empty());
    assert!(employees.get_employee(other).unwrap().is_some());
}

#[test]
fn update_project_replaces_fields() {
    let store = store();
    let f = fixture(&store);
    let projects = ProjectService::new(&store);

    let updated = projects
        .update_project(f.p3, "P3", "third, now running", "ACTIU")
        .unwrap()
        .unwrap();
    assert_eq!(updated.status.as_deref(), Some("ACTIU"));
    let loaded = projects.get_project(f.p3).unwrap().unwrap();
    assert!(loaded.same_fields(&updated));

    assert!(projects
        .update_project(404, "x", "y", "z")
        .unwrap()
        .is_none());
}
