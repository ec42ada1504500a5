//! Demo entry point.
//!
//! # Responsibility
//! - Seed the sample workforce dataset into the configured store.
//! - Print a short summary of the association lookups.
//!
//! Settings come from `WORKFORCE_*` environment variables; without
//! `WORKFORCE_DB_PATH` the store lives in memory.

use log::info;
use std::error::Error;
use workforce_core::{
    init_logging_from_env, ContactService, Employee, EmployeeService, EntityRepository, ListQuery,
    Project, ProjectService, SortDirection, Store, StoreConfig,
};

struct SeedEmployee {
    first_name: &'static str,
    last_name: &'static str,
    salary: i32,
    contacts: &'static [(&'static str, &'static str, &'static str)],
    projects: &'static [&'static str],
}

const PROJECTS: &[(&str, &str, &str)] = &[
    ("Web Corporativa", "Desenvolupament web responsive", "ACTIU"),
    ("App Mòbil", "Aplicació Android/iOS", "ACTIU"),
    ("Intranet", "Portal intern", "PLANIFICAT"),
];

const EMPLOYEES: &[SeedEmployee] = &[
    SeedEmployee {
        first_name: "Joan",
        last_name: "Garcia",
        salary: 35000,
        contacts: &[
            ("EMAIL", "joan.garcia@empresa.cat", "Email corporatiu"),
            ("PHONE", "666111222", "Telèfon mòbil"),
            ("ADDRESS", "Carrer Major 1, Barcelona", "Adreça personal"),
        ],
        projects: &["Web Corporativa", "Intranet"],
    },
    SeedEmployee {
        first_name: "Marta",
        last_name: "Ferrer",
        salary: 42000,
        contacts: &[
            ("EMAIL", "marta.ferrer@empresa.cat", "Email corporatiu"),
            ("EMAIL", "martaf@gmail.com", "Email personal"),
            ("PHONE", "666333444", "Telèfon mòbil"),
        ],
        projects: &["Web Corporativa", "App Mòbil"],
    },
    SeedEmployee {
        first_name: "Pere",
        last_name: "Soler",
        salary: 38000,
        contacts: &[
            ("EMAIL", "pere.soler@empresa.cat", "Email corporatiu"),
            ("PHONE", "666555666", "Telèfon empresa"),
        ],
        projects: &["App Mòbil"],
    },
    SeedEmployee {
        first_name: "Laia",
        last_name: "Puig",
        salary: 45000,
        contacts: &[
            ("EMAIL", "laia.puig@empresa.cat", "Email corporatiu"),
            ("PHONE", "666777888", "Telèfon mòbil"),
            ("ADDRESS", "Avinguda Diagonal 100, Barcelona", "Adreça oficina"),
        ],
        projects: &["App Mòbil", "Intranet"],
    },
];

fn main() -> Result<(), Box<dyn Error>> {
    init_logging_from_env()?;
    let store = Store::open(&StoreConfig::from_env()?)?;

    let seeded = seed(&store);
    let summary = seeded.and_then(|projects| print_summary(&store, &projects));
    store.close()?;
    summary
}

fn seed(store: &Store) -> Result<Vec<Project>, Box<dyn Error>> {
    let employees = EmployeeService::new(store);
    let contacts = ContactService::new(store);
    let projects = ProjectService::new(store);

    let mut created_projects = Vec::with_capacity(PROJECTS.len());
    for (name, description, status) in PROJECTS {
        created_projects.push(projects.add_project(*name, *description, *status)?);
    }

    for seed in EMPLOYEES {
        let employee = employees.add_employee(seed.first_name, seed.last_name, seed.salary)?;
        let employee_id = employee.id.ok_or("employee insert returned no id")?;

        for (contact_type, value, description) in seed.contacts {
            contacts.add_contact_to_employee(
                employee_id,
                *contact_type,
                *value,
                Some(description.to_string()),
            )?;
        }

        let project_ids: Vec<i64> = created_projects
            .iter()
            .filter(|project| seed.projects.contains(&project.name.as_str()))
            .filter_map(|project| project.id)
            .collect();
        projects.replace_project_links(employee_id, &project_ids)?;
    }

    info!(
        "event=demo_seed module=cli status=ok employees={} projects={}",
        EMPLOYEES.len(),
        created_projects.len()
    );
    Ok(created_projects)
}

fn print_summary(store: &Store, projects: &[Project]) -> Result<(), Box<dyn Error>> {
    let repo = EntityRepository::new(store);
    let employees = EmployeeService::new(store);
    let project_service = ProjectService::new(store);

    println!("=== Employees ===");
    let by_last_name = ListQuery::all().order_by("last_name", SortDirection::Ascending);
    for employee in repo.list_all::<Employee>(&by_last_name)? {
        let Some(id) = employee.id else { continue };
        let Some(graph) = employees.load_employee_graph(id)? else {
            continue;
        };
        println!(
            "{} {} salary={} contacts={} projects={}",
            employee.first_name,
            employee.last_name,
            employee.salary,
            graph.contact_count(),
            graph.project_count()
        );
    }

    println!("=== Projects ===");
    for project in projects {
        let Some(id) = project.id else { continue };
        if let Some(graph) = project_service.load_project_graph(id)? {
            println!(
                "{} [{}] employees={}",
                project.name,
                project.status.as_deref().unwrap_or("-"),
                graph.employee_count()
            );
        }
    }

    println!("=== Employees with a phone ===");
    for employee in employees.find_employees_by_contact_type("PHONE")? {
        println!("{} {}", employee.first_name, employee.last_name);
    }

    if let Some(app_id) = projects
        .iter()
        .find(|project| project.name == "App Mòbil")
        .and_then(|project| project.id)
    {
        println!("=== Employees on 'App Mòbil' ===");
        for employee in employees.find_employees_by_project(app_id)? {
            println!("{} {}", employee.first_name, employee.last_name);
        }
    }

    Ok(())
}
