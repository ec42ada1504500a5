use std::collections::BTreeSet;
use std::thread;
use workforce_core::{
    Contact, ContactService, EmployeeService, EntityRepository, ProjectService, Store,
};

const WORKERS: usize = 4;
const CONTACTS_PER_WORKER: usize = 25;

#[test]
fn one_store_serializes_units_of_work_from_many_threads() {
    let store = Store::open_in_memory().unwrap();
    let projects = ProjectService::new(&store);
    let web = projects.add_project("Web", "desc", "ACTIU").unwrap().id.unwrap();
    let app = projects.add_project("App", "desc", "ACTIU").unwrap().id.unwrap();

    let employee_ids: Vec<i64> = (0..WORKERS)
        .map(|worker| {
            EmployeeService::new(&store)
                .add_employee("Worker", format!("N{worker}"), 30000)
                .unwrap()
                .id
                .unwrap()
        })
        .collect();

    thread::scope(|scope| {
        for &employee_id in &employee_ids {
            let store = &store;
            scope.spawn(move || {
                let contacts = ContactService::new(store);
                let projects = ProjectService::new(store);
                for index in 0..CONTACTS_PER_WORKER {
                    contacts
                        .add_contact_to_employee(
                            employee_id,
                            "PHONE",
                            format!("6{employee_id:02}{index:06}"),
                            None,
                        )
                        .unwrap()
                        .unwrap();
                    // The last iteration has an even index, so every worker ends on both projects.
                    let target = if index % 2 == 0 { vec![web, app] } else { vec![web] };
                    projects
                        .replace_project_links(employee_id, &target)
                        .unwrap()
                        .unwrap();
                }
            });
        }
    });

    let repo = EntityRepository::new(&store);
    assert_eq!(
        repo.count::<Contact>().unwrap(),
        (WORKERS * CONTACTS_PER_WORKER) as u64
    );

    let employees = EmployeeService::new(&store);
    for &employee_id in &employee_ids {
        let graph = employees.load_employee_graph(employee_id).unwrap().unwrap();
        assert_eq!(graph.contact_count(), CONTACTS_PER_WORKER);
        assert_eq!(graph.project_ids(), vec![web, app]);
    }

    let expected: BTreeSet<i64> = employee_ids.iter().copied().collect();
    for project_id in [web, app] {
        let on_project: BTreeSet<i64> = projects
            .load_project_graph(project_id)
            .unwrap()
            .unwrap()
            .employees()
            .filter_map(|employee| employee.id)
            .collect();
        assert_eq!(on_project, expected);
    }
}
