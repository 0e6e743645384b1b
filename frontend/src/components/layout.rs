use brava_shared::Permission;
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::components::login::{LoginPage, RegisterNotice};
use crate::components::resource::ResourcePage;
use crate::web::route::{Layout, View};
use crate::{Screen, use_app, use_shell};

/// 侧边栏：链接 + 任一权限即可见
const NAV_ITEMS: &[(&str, &str, &[Permission])] = &[
    ("#/dashboard", "Dashboard", &[Permission::ViewDashboard]),
    (
        "#/products",
        "Produtos",
        &[Permission::ViewProducts, Permission::ManageProducts],
    ),
    (
        "#/orders",
        "Pedidos",
        &[Permission::ViewOrders, Permission::ManageOrders],
    ),
    ("#/customers", "Clientes", &[Permission::ViewCustomers]),
];

/// 根组件：加载屏、错误横幅、基础布局
#[component]
pub fn AppShell() -> impl IntoView {
    let shell = use_shell();

    view! {
        <Show when=move || shell.error.get().is_some()>
            <div role="alert" class="alert alert-error rounded-none">
                <span>{move || shell.error.get().unwrap_or_default()}</span>
            </div>
        </Show>
        <Show
            when=move || !shell.loading.get()
            fallback=|| view! {
                <div class="flex items-center justify-center min-h-screen">
                    <span class="loading loading-spinner loading-lg text-primary"></span>
                </div>
            }
        >
            {move || match shell.layout.get() {
                Some(Layout::Main) => view! { <MainLayout /> }.into_any(),
                Some(Layout::Auth) => view! { <AuthLayout /> }.into_any(),
                None => ().into_any(),
            }}
        </Show>
    }
}

#[component]
fn AuthLayout() -> impl IntoView {
    view! {
        <div class="hero min-h-screen bg-base-200">
            <div class="hero-content flex-col w-full max-w-md">
                <ScreenOutlet />
            </div>
        </div>
    }
}

#[component]
fn MainLayout() -> impl IntoView {
    let app = use_app();

    let user_label = move || {
        app.get()
            .current_user()
            .and_then(|u| u.extra.get("email").and_then(|e| e.as_str()).map(String::from))
            .unwrap_or_default()
    };

    let nav = NAV_ITEMS
        .iter()
        .filter(|(_, _, any_of)| {
            let session = app.get().services().session.clone();
            any_of.iter().any(|p| session.has_permission(*p))
        })
        .map(|(href, label, _)| {
            view! {
                <li><a href=*href>{*label}</a></li>
            }
        })
        .collect_view();

    let on_logout = move |_| {
        let session = app.get().services().session.clone();
        spawn_local(async move {
            session.logout().await;
        });
    };

    view! {
        <div class="drawer lg:drawer-open">
            <input id="sidebar" type="checkbox" class="drawer-toggle" />
            <div class="drawer-content flex flex-col">
                <div class="navbar bg-base-100 shadow-sm">
                    <div class="flex-1">
                        <span class="text-xl font-bold px-2">"Brava Admin"</span>
                    </div>
                    <div class="flex-none gap-2">
                        <span class="text-sm text-base-content/70">{user_label}</span>
                        <a href="#/settings" class="btn btn-ghost btn-sm">"Configurações"</a>
                        <button class="btn btn-ghost btn-sm" on:click=on_logout>"Sair"</button>
                    </div>
                </div>
                <main class="p-6">
                    <ScreenOutlet />
                </main>
            </div>
            <div class="drawer-side">
                <label for="sidebar" class="drawer-overlay"></label>
                <ul class="menu p-4 w-64 min-h-full bg-base-200">{nav}</ul>
            </div>
        </div>
    }
}

/// 按当前 `Screen` 渲染内容区域
#[component]
fn ScreenOutlet() -> impl IntoView {
    let shell = use_shell();

    move || match shell.screen.get() {
        Screen::Blank => ().into_any(),
        Screen::NotFound => view! {
            <div class="flex items-center justify-center min-h-[50vh]">
                <div class="text-center">
                    <h1 class="text-6xl font-bold text-error">"404"</h1>
                    <p class="text-xl mt-4">"Página não encontrada"</p>
                    <a href="#/" class="btn btn-link mt-2">"Voltar ao início"</a>
                </div>
            </div>
        }
        .into_any(),
        Screen::View(View::Login) => view! { <LoginPage /> }.into_any(),
        Screen::View(View::Register) => view! { <RegisterNotice /> }.into_any(),
        Screen::View(target) => view! { <ResourcePage target=target /> }.into_any(),
    }
}
